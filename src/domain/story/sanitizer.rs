//! 故事清洗器
//!
//! 将上游生成的原始文本收敛到严格的字符集与句式：
//! - zh: 只保留汉字、"。"、"，"，最多 10 句，每句以 "。" 结尾
//! - en: 只保留英文字母、空格、逗号、句号，最多 10 句，以 ". " 连接
//!
//! 清洗结果为空表示内容不可用，调用方应改用兜底故事。

use super::ending::rewrite_ending;
use super::Language;

/// 单个故事最多保留的句数
pub const MAX_SENTENCES: usize = 10;

#[inline]
fn is_cjk_ideograph(c: char) -> bool {
    matches!(c, '\u{3400}'..='\u{4DBF}' | '\u{4E00}'..='\u{9FFF}')
}

/// 按语言清洗文本，结果可能为空
///
/// 幂等: `sanitize(sanitize(x)) == sanitize(x)`
pub fn sanitize(raw: &str, language: Language) -> String {
    match language {
        Language::Zh => sanitize_zh(raw),
        Language::En => sanitize_en(raw),
    }
}

/// 先改写结尾再清洗
///
/// 返回空字符串表示需要兜底
pub fn clean_story(raw: &str, language: Language, seed: &str) -> String {
    let rewritten = rewrite_ending(raw, language, seed);
    sanitize(&rewritten, language)
}

fn sanitize_zh(raw: &str) -> String {
    let filtered: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            '？' | '！' => '。',
            other => other,
        })
        .filter(|&c| is_cjk_ideograph(c) || c == '。' || c == '，')
        .collect();

    let sentences: Vec<&str> = filtered
        .split('。')
        .map(|piece| piece.trim_end_matches('，'))
        .filter(|piece| !piece.is_empty())
        .take(MAX_SENTENCES)
        .collect();

    if sentences.is_empty() {
        return String::new();
    }
    format!("{}。", sentences.join("。"))
}

fn sanitize_en(raw: &str) -> String {
    let mut cleaned = String::with_capacity(raw.len());
    for c in raw.chars() {
        let c = match c {
            c if c.is_whitespace() => ' ',
            '!' | '?' => '.',
            c => c,
        };
        if !(c.is_ascii_alphabetic() || matches!(c, ' ' | ',' | '.')) {
            continue;
        }
        // 连续的空格或逗号只保留一个
        if matches!(c, ' ' | ',') && cleaned.ends_with(c) {
            continue;
        }
        cleaned.push(c);
    }

    let sentences: Vec<&str> = cleaned
        .split('.')
        .map(|s| s.trim().trim_end_matches([',', ' ']).trim())
        .filter(|s| !s.is_empty())
        .take(MAX_SENTENCES)
        .collect();

    if sentences.is_empty() {
        return String::new();
    }
    format!("{}.", sentences.join(". "))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: &[&str] = &[
        "",
        "   ",
        "从前，有一只小猫！它很开心？？  \n 然后它睡着了。。。",
        "Hello!!  world?? this is,, a test... ok",
        "😀😀😀",
        "a , b , , c.",
        "，，，。。，开头是逗号。",
        ",leading comma. trailing comma,,,.",
        "第一句。第二句。第三句。第四句。第五句。第六句。第七句。第八句。第九句。第十句。第十一句。",
        "One. Two. Three. Four. Five. Six. Seven. Eight. Nine. Ten. Eleven. Twelve.",
        "Mixed 中文 and English！混合？",
        "\t tabs\tand\nnewlines \r\n everywhere",
    ];

    #[test]
    fn test_zh_rules() {
        let out = sanitize("从前，有一只小猫！它很开心？？  \n 然后它睡着了abc123。。。", Language::Zh);
        assert_eq!(out, "从前，有一只小猫。它很开心。然后它睡着了。");
    }

    #[test]
    fn test_zh_strips_trailing_commas_and_caps_sentences() {
        assert_eq!(sanitize("你好，，。再见，", Language::Zh), "你好。再见。");

        let many = "一。二。三。四。五。六。七。八。九。十。十一。十二。";
        let out = sanitize(many, Language::Zh);
        assert_eq!(out.matches('。').count(), MAX_SENTENCES);
        assert!(out.ends_with("十。"));
    }

    #[test]
    fn test_zh_empty_when_nothing_survives() {
        assert_eq!(sanitize("hello world!!! 123", Language::Zh), "");
        assert_eq!(sanitize("。。，，！？", Language::Zh), "");
    }

    #[test]
    fn test_en_rules() {
        let out = sanitize("Hello!!  world?? this is,, a test... ok", Language::En);
        assert_eq!(out, "Hello. world. this is, a test. ok.");
    }

    #[test]
    fn test_en_drops_symbols_and_digits() {
        let out = sanitize("The cat (age 3) said: \"meow\" 😀", Language::En);
        assert_eq!(out, "The cat age said meow.");
    }

    #[test]
    fn test_en_trailing_commas_removed() {
        assert_eq!(sanitize("trailing comma,,,.", Language::En), "trailing comma.");
        assert_eq!(sanitize("...,,,...", Language::En), "");
    }

    #[test]
    fn test_en_caps_sentences() {
        let out = sanitize(SAMPLES[9], Language::En);
        assert_eq!(out.matches('.').count(), MAX_SENTENCES);
        assert!(out.ends_with("Ten."));
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        for sample in SAMPLES {
            for language in Language::ALL {
                let once = sanitize(sample, language);
                let twice = sanitize(&once, language);
                assert_eq!(once, twice, "not idempotent for {:?} ({})", sample, language);
            }
        }
    }

    #[test]
    fn test_clean_story_rewrites_sleepy_ending() {
        let raw = "小兔子找到了一个红气球。它们一起玩了一整天。晚安我的宝贝，做一个甜甜的梦。";
        let out = clean_story(raw, Language::Zh, "seed");
        assert!(out.starts_with("小兔子找到了一个红气球。它们一起玩了一整天。"));
        assert!(!out.contains("晚安"));
        assert!(out.ends_with('。'));
    }
}
