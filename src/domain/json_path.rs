//! JSON 多路径提取
//!
//! 上游服务的响应结构并不统一，同一个字段可能出现在不同位置。
//! `JsonPathExtractor` 按顺序尝试一组点分路径（数字段表示数组下标），
//! 返回第一个非空结果。

use serde_json::Value;

/// 有序多路径提取器
#[derive(Debug, Clone)]
pub struct JsonPathExtractor {
    paths: Vec<&'static str>,
}

impl JsonPathExtractor {
    pub const fn new(paths: Vec<&'static str>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &[&'static str] {
        &self.paths
    }

    /// 第一个存在且非 null 的值
    pub fn first_value<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        self.paths
            .iter()
            .filter_map(|path| lookup(root, path))
            .find(|v| !v.is_null())
    }

    /// 第一个非空文本
    ///
    /// 字符串直接使用；片段数组拼接其中的 `text` 字段
    pub fn first_text(&self, root: &Value) -> Option<String> {
        self.paths
            .iter()
            .filter_map(|path| lookup(root, path))
            .filter_map(as_text)
            .find(|text| !text.trim().is_empty())
    }
}

/// 按点分路径查找
pub fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(root, |node, segment| match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(parts) => {
            let joined: String = parts
                .iter()
                .filter_map(|part| match part {
                    Value::String(s) => Some(s.as_str()),
                    Value::Object(map) => map.get("text").and_then(Value::as_str),
                    _ => None,
                })
                .collect();
            Some(joined)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reply_extractor() -> JsonPathExtractor {
        JsonPathExtractor::new(vec![
            "choices.0.message.content",
            "choices.0.text",
            "output.text",
            "content",
        ])
    }

    #[test]
    fn test_first_matching_path_wins() {
        let body = json!({
            "choices": [{"message": {"content": "from message"}, "text": "from text"}],
            "content": "from root"
        });
        assert_eq!(reply_extractor().first_text(&body).as_deref(), Some("from message"));
    }

    #[test]
    fn test_empty_values_are_skipped() {
        let body = json!({
            "choices": [{"message": {"content": "  "}}],
            "output": {"text": "dashscope style"}
        });
        assert_eq!(reply_extractor().first_text(&body).as_deref(), Some("dashscope style"));
    }

    #[test]
    fn test_part_arrays_are_flattened() {
        let body = json!({
            "choices": [{"message": {"content": [
                {"type": "text", "text": "Hello "},
                {"type": "audio", "audio": "..."},
                {"type": "text", "text": "there"}
            ]}}]
        });
        assert_eq!(reply_extractor().first_text(&body).as_deref(), Some("Hello there"));
    }

    #[test]
    fn test_nothing_found() {
        assert_eq!(reply_extractor().first_text(&json!({"choices": []})), None);
        assert_eq!(reply_extractor().first_text(&json!("plain")), None);
    }

    #[test]
    fn test_lookup_array_index() {
        let body = json!({"a": [{"b": 1}, {"b": 2}]});
        assert_eq!(lookup(&body, "a.1.b"), Some(&json!(2)));
        assert_eq!(lookup(&body, "a.x.b"), None);
        assert_eq!(lookup(&body, "a.5"), None);
    }

    #[test]
    fn test_first_value_skips_null() {
        let extractor = JsonPathExtractor::new(vec!["audio", "data.audio"]);
        let body = json!({"audio": null, "data": {"audio": "QUJD"}});
        assert_eq!(extractor.first_value(&body), Some(&json!("QUJD")));
    }
}
