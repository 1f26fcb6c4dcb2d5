//! 结尾改写
//!
//! 故事不能读起来像催眠曲：检测原文末尾的"晚安/睡觉"类收尾句，
//! 去掉后换成按种子稳定选择的活力告别句。

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

use super::stable_choice::stable_choice;
use super::Language;

/// 最多剥离的收尾句数
const MAX_STRIPPED_SENTENCES: usize = 3;

static ZH_SLEEPY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"晚安|好梦|甜甜的梦|美梦|睡觉|睡吧|睡着|入睡|梦乡|闭上眼睛|进入梦|休息吧|摇篮")
        .expect("zh sleepy pattern")
});

static EN_SLEEPY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(good\s*night|sweet\s+dreams?|sleep\w*|asleep|bed\s*time|close\s+your\s+eyes|dream\s*land|drift(s|ed|ing)?\s+off|lullaby|tuck(ed)?\s+in|nap)\b",
    )
    .expect("en sleepy pattern")
});

const ZH_ENDINGS: [&str; 5] = [
    "明天我们再一起出发去冒险吧。",
    "小伙伴们挥挥手，约好下次再见。",
    "大家跳起舞来，笑声传遍了整个森林。",
    "新的冒险又开始啦，我们一起出发吧。",
    "它大声说，再见啦，下次还要一起玩。",
];

const EN_ENDINGS: [&str; 5] = [
    "Then everyone waved goodbye and ran off to find the next adventure.",
    "See you soon, said the friends, ready for more fun tomorrow.",
    "And with a big cheer, they raced off to play again.",
    "The friends gave a high five and promised to explore again soon.",
    "Off they went, laughing all the way to the next surprise.",
];

fn is_sentence_end(c: char) -> bool {
    matches!(c, '。' | '！' | '？' | '.' | '!' | '?' | '\n')
}

/// 切分句子，保留每句的结尾标点
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for (idx, c) in text.char_indices() {
        if is_sentence_end(c) {
            let end = idx + c.len_utf8();
            sentences.push(&text[start..end]);
            start = end;
        }
    }
    if start < text.len() {
        sentences.push(&text[start..]);
    }
    sentences
}

fn is_sleepy(sentence: &str, language: Language) -> bool {
    match language {
        Language::Zh => ZH_SLEEPY.is_match(sentence),
        Language::En => EN_SLEEPY.is_match(sentence),
    }
}

/// 按种子选择告别句
pub fn energetic_ending(seed: &str, language: Language) -> &'static str {
    match language {
        Language::Zh => *stable_choice(seed, &ZH_ENDINGS),
        Language::En => *stable_choice(seed, &EN_ENDINGS),
    }
}

/// 改写困倦的结尾
///
/// 未命中时原样返回（`Cow::Borrowed`）
pub fn rewrite_ending<'a>(raw: &'a str, language: Language, seed: &str) -> Cow<'a, str> {
    let mut sentences = split_sentences(raw);
    let mut stripped = 0;

    while stripped < MAX_STRIPPED_SENTENCES {
        // 末尾的纯空白片段不算一句
        while sentences.last().is_some_and(|s| s.trim().is_empty()) {
            sentences.pop();
        }
        match sentences.last() {
            Some(last) if is_sleepy(last, language) => {
                sentences.pop();
                stripped += 1;
            }
            _ => break,
        }
    }

    if stripped == 0 {
        return Cow::Borrowed(raw);
    }

    let kept: String = sentences.concat();
    let mut out = kept
        .trim_end()
        .trim_end_matches(['，', ',', '、', ' '])
        .to_string();

    if !out.is_empty() && !out.ends_with(is_sentence_end) {
        out.push(language.terminator());
    }
    if language == Language::En && !out.is_empty() {
        out.push(' ');
    }
    out.push_str(energetic_ending(seed, language));

    tracing::debug!(
        language = %language,
        stripped_sentences = stripped,
        "Sleepy ending rewritten"
    );

    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zh_bedtime_clause_replaced() {
        let raw = "小熊找到了蜂蜜。晚安我的宝贝，做一个甜甜的梦。";
        let out = rewrite_ending(raw, Language::Zh, "蜂蜜");
        let ending = energetic_ending("蜂蜜", Language::Zh);
        assert_eq!(out, format!("小熊找到了蜂蜜。{}", ending));
        assert!(ZH_ENDINGS.contains(&ending));
    }

    #[test]
    fn test_zh_only_sleepy_text() {
        let out = rewrite_ending("晚安我的宝贝，做一个甜甜的梦。", Language::Zh, "x");
        assert_eq!(out, energetic_ending("x", Language::Zh));
    }

    #[test]
    fn test_en_multiple_sleepy_sentences() {
        let raw = "The fox found a kite. It was time for bed. Close your eyes. Good night, little one!\n";
        let out = rewrite_ending(raw, Language::En, "kite");
        // "It was time for bed" 不含 bedtime 关键词组合，保留
        assert!(out.starts_with("The fox found a kite. It was time for bed. "));
        assert!(out.ends_with(energetic_ending("kite", Language::En)));
        assert!(!out.to_lowercase().contains("good night"));
    }

    #[test]
    fn test_unmatched_text_is_borrowed() {
        let raw = "The dinosaur danced all day.";
        assert!(matches!(rewrite_ending(raw, Language::En, "d"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_sleepy_in_middle_untouched() {
        let raw = "小猫睡着了。醒来后它去冒险。";
        assert_eq!(rewrite_ending(raw, Language::Zh, "s"), raw);
    }

    #[test]
    fn test_endings_never_look_sleepy() {
        for ending in ZH_ENDINGS {
            assert!(!is_sleepy(ending, Language::Zh));
        }
        for ending in EN_ENDINGS {
            assert!(!is_sleepy(ending, Language::En));
        }
    }

    #[test]
    fn test_rewrite_is_stable() {
        let raw = "The bunny played. Sweet dreams.";
        let once = rewrite_ending(raw, Language::En, "b").into_owned();
        let twice = rewrite_ending(&once, Language::En, "b");
        assert_eq!(once, twice);
    }

    #[test]
    fn test_ending_choice_follows_seed() {
        assert_eq!(
            energetic_ending("same seed", Language::En),
            energetic_ending("same seed", Language::En)
        );
    }
}
