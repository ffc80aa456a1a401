//! 内联样式解析
//!
//! 只关心决定节点可见性的声明（`display`、`visibility`），
//! 使用 cssparser 对 `style` 属性做 token 级解析。

use cssparser::{Parser, ParserInput, Token};

/// 节点可见性
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    Visible,
    Hidden,
}

impl Visibility {
    pub fn is_hidden(self) -> bool {
        self == Visibility::Hidden
    }
}

/// 单条样式声明
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub value: String,
}

/// 解析后的内联样式
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineStyle {
    declarations: Vec<Declaration>,
}

impl InlineStyle {
    /// 解析 `style` 属性的内容
    ///
    /// 不合法的声明会被跳过，不影响后续声明。
    pub fn parse(css: &str) -> Self {
        let mut input = ParserInput::new(css);
        let mut parser = Parser::new(&mut input);
        let mut declarations = Vec::new();

        let mut name: Option<String> = None;
        let mut seen_colon = false;
        let mut value_parts: Vec<String> = Vec::new();

        loop {
            let token = match parser.next() {
                Ok(token) => token.clone(),
                Err(_) => break,
            };

            match token {
                Token::Semicolon => {
                    push_declaration(&mut declarations, name.take(), seen_colon, &mut value_parts);
                    seen_colon = false;
                }
                Token::Colon if name.is_some() && !seen_colon => seen_colon = true,
                Token::Ident(ident) if !seen_colon => {
                    if name.is_none() {
                        name = Some(ident.to_ascii_lowercase());
                    } else {
                        // 属性名后面又出现标识符，声明无效
                        name = None;
                    }
                }
                Token::Ident(ident) => value_parts.push(ident.to_ascii_lowercase()),
                Token::Delim('!') if seen_colon => {
                    // `!important` 不影响取值
                    let _ = parser.expect_ident_matching("important");
                }
                Token::Hash(value) | Token::IDHash(value) if seen_colon => {
                    value_parts.push(format!("#{}", value.to_ascii_lowercase()))
                }
                Token::Number { value, .. } if seen_colon => value_parts.push(value.to_string()),
                Token::Dimension { value, unit, .. } if seen_colon => {
                    value_parts.push(format!("{}{}", value, unit.to_ascii_lowercase()))
                }
                Token::Function(function) if seen_colon => {
                    // 函数参数块由解析器自动跳过
                    value_parts.push(format!("{}()", function.to_ascii_lowercase()));
                }
                _ => {}
            }
        }
        push_declaration(&mut declarations, name, seen_colon, &mut value_parts);

        Self { declarations }
    }

    /// 获取属性的最终取值（后出现的声明覆盖先出现的）
    pub fn get(&self, property: &str) -> Option<&str> {
        self.declarations
            .iter()
            .rev()
            .find(|declaration| declaration.name == property)
            .map(|declaration| declaration.value.as_str())
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    /// 是否声明了 `display: none`
    pub fn is_display_none(&self) -> bool {
        self.get("display") == Some("none")
    }

    /// 显式声明的 `visibility`，未声明或取值无法识别时返回 `None`
    pub fn visibility(&self) -> Option<Visibility> {
        match self.get("visibility")? {
            "hidden" | "collapse" => Some(Visibility::Hidden),
            "visible" => Some(Visibility::Visible),
            _ => None,
        }
    }
}

fn push_declaration(
    declarations: &mut Vec<Declaration>,
    name: Option<String>,
    seen_colon: bool,
    value_parts: &mut Vec<String>,
) {
    if let Some(name) = name {
        if seen_colon && !value_parts.is_empty() {
            declarations.push(Declaration {
                name,
                value: value_parts.join(" "),
            });
        }
    }
    value_parts.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_none_detection() {
        assert!(InlineStyle::parse("display:none").is_display_none());
        assert!(InlineStyle::parse("color: red; DISPLAY : None !important;").is_display_none());
        assert!(!InlineStyle::parse("display: block").is_display_none());
        assert!(!InlineStyle::parse("display: none; display: flex").is_display_none());
    }

    #[test]
    fn test_visibility_values() {
        assert_eq!(
            InlineStyle::parse("visibility: hidden").visibility(),
            Some(Visibility::Hidden)
        );
        assert_eq!(
            InlineStyle::parse("visibility: collapse").visibility(),
            Some(Visibility::Hidden)
        );
        assert_eq!(
            InlineStyle::parse("visibility: visible").visibility(),
            Some(Visibility::Visible)
        );
        assert_eq!(InlineStyle::parse("margin: 0").visibility(), None);
    }

    #[test]
    fn test_hash_colors_are_kept() {
        let style = InlineStyle::parse("background-color: #E8F5E9");
        assert_eq!(style.get("background-color"), Some("#e8f5e9"));
    }

    #[test]
    fn test_malformed_declarations_are_skipped() {
        let style = InlineStyle::parse("color red; ; width: calc(1px + 2px); display: none");
        assert_eq!(style.get("color"), None);
        assert_eq!(style.get("width"), Some("calc()"));
        assert!(style.is_display_none());
    }
}
