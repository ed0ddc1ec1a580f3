//! 子单元提示词组装
//!
//! 固定指令模板 + 批次上下文 + 前情提要 + 衔接锚点 + 当前小故事

use crate::application::ports::ChatMessage;
use crate::domain::generation::{ContinuityAnchor, SubUnit};

const SYSTEM_PROMPT: &str = "你是一位经验丰富的网络小说作家，擅长长篇连载写作。\
你严格遵守给定的故事架构和章节细纲，只输出小说正文，不输出任何解释或说明。";

/// 一次子单元调用所需的全部材料
#[derive(Debug, Clone, Copy)]
pub struct SubUnitPrompt<'a> {
    pub sub_unit: &'a SubUnit,
    /// 批次上下文
    pub context: &'a str,
    pub focus: Option<&'a str>,
    pub memory: Option<&'a str>,
    pub anchor: Option<&'a ContinuityAnchor>,
}

impl SubUnitPrompt<'_> {
    fn chapter_list(&self) -> String {
        self.sub_unit
            .chapters()
            .iter()
            .map(|n| format!("第{}章", n))
            .collect::<Vec<_>>()
            .join("、")
    }

    fn instructions(&self) -> String {
        let first = self.sub_unit.first_chapter;
        let mut lines = vec![
            "【写作任务】".to_string(),
            format!("本次输出章节：{}", self.chapter_list()),
            "格式要求：".to_string(),
            "1. 每章以单独一行的章节标记开头，格式为：第N章 [章节标题]".to_string(),
            format!(
                "2. 章节号必须从第{}章开始连续递增，共{}章，不多不少",
                first,
                self.sub_unit.chapter_count()
            ),
            "3. 每章正文不少于2000字，情节推进要具体，避免空泛总结".to_string(),
            "4. 只输出正文，不要输出 Markdown 标记、分隔线或任何说明文字".to_string(),
        ];
        if first > 1 {
            lines.push(format!(
                "5. 第{}章必须紧接上一章结尾继续，不得重复开篇或跳过时间",
                first
            ));
        }
        lines.join("\n")
    }

    /// 组装消息列表
    pub fn to_messages(&self) -> Vec<ChatMessage> {
        let mut sections = vec![self.context.to_string()];
        if let Some(memory) = self.memory {
            sections.push(memory.to_string());
        }
        if let Some(anchor) = self.anchor.filter(|a| !a.is_empty()) {
            sections.push(anchor.prompt_fragment());
        }
        if let Some(focus) = self.focus {
            sections.push(focus.to_string());
        }
        sections.push(self.instructions());

        vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(sections.join("\n\n")),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::ChatRole;

    #[test]
    fn test_messages_contain_all_parts_in_order() {
        let sub_unit = SubUnit {
            unit_index: 2,
            first_chapter: 5,
            last_chapter: 6,
        };
        let anchor = ContinuityAnchor {
            ending: "门外传来脚步声。".to_string(),
            last_sentence: "门外传来脚步声。".to_string(),
        };
        let prompt = SubUnitPrompt {
            sub_unit: &sub_unit,
            context: "CONTEXT",
            focus: Some("FOCUS"),
            memory: Some("MEMORY"),
            anchor: Some(&anchor),
        };
        let messages = prompt.to_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, ChatRole::System);

        let user = &messages[1].content;
        let order: Vec<usize> = ["CONTEXT", "MEMORY", "上一章结尾", "FOCUS", "本次输出章节：第5章、第6章"]
            .iter()
            .map(|needle| user.find(needle).unwrap())
            .collect();
        assert!(order.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_first_chapter_has_no_continuation_rule() {
        let sub_unit = SubUnit {
            unit_index: 0,
            first_chapter: 1,
            last_chapter: 2,
        };
        let prompt = SubUnitPrompt {
            sub_unit: &sub_unit,
            context: "CONTEXT",
            focus: None,
            memory: None,
            anchor: None,
        };
        let user = &prompt.to_messages()[1].content;
        assert!(!user.contains("紧接上一章"));
        assert!(!user.contains("上一章结尾"));
    }
}
