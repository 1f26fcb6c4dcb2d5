//! 兜底故事生成器
//!
//! 上游生成失败、超时或内容无法通过清洗时，按种子确定性地拼出一个合规故事。
//! 输出永远满足清洗规则，调用方不需要也不应该再次清洗。

use super::stable_choice::stable_choice;
use super::Language;

const MIN_SENTENCES: usize = 6;
const SENTENCE_SPAN: usize = 5;

const ZH_ANIMALS: &[&str] = &[
    "小兔子", "小熊猫", "小狐狸", "小松鼠", "小企鹅", "小恐龙", "小海豚", "小刺猬",
];
const ZH_ITEMS: &[&str] = &[
    "红气球", "魔法帽", "小木船", "金钥匙", "彩色铅笔", "会唱歌的贝壳", "小星星", "神奇雨伞",
];
const ZH_SOUNDS: &[&str] = &["叮叮当", "咚咚咚", "哗啦啦", "嘀嘀嗒", "呼噜噜", "咕噜噜"];

const ZH_TEMPLATES: [&str; 10] = [
    "从前有一只{animal}，住在开满野花的山坡上",
    "有一天，{animal}在草地上发现了一个{item}",
    "{item}忽然发出{sound}的声音",
    "{animal}吓了一跳，又好奇地凑过去看",
    "原来{item}里藏着一张小小的地图",
    "{animal}带着{item}，沿着地图一路向前跑",
    "路上它遇到了好多新朋友，大家一起唱歌",
    "他们翻过小山，跨过小河，{sound}的声音一直陪着他们",
    "最后他们找到了一片会发光的彩虹花田",
    "{animal}开心地说，明天还要继续去冒险",
];

const EN_ANIMALS: &[&str] = &[
    "bunny", "panda", "fox", "squirrel", "penguin", "dinosaur", "dolphin", "hedgehog",
];
const EN_ITEMS: &[&str] = &[
    "red balloon",
    "magic hat",
    "wooden boat",
    "golden key",
    "box of crayons",
    "singing seashell",
    "little star",
    "magic umbrella",
];
const EN_SOUNDS: &[&str] = &[
    "boom boom",
    "ding dong",
    "splish splash",
    "tick tock",
    "whoosh",
    "beep beep",
];

const EN_TEMPLATES: [&str; 10] = [
    "Once upon a time, a little {animal} lived on a sunny hill",
    "One day, the {animal} found a {item} in the tall grass",
    "The {item} suddenly went {sound}",
    "The {animal} jumped up, then leaned in to take a closer look",
    "Inside the {item} was a tiny treasure map",
    "The {animal} picked up the {item} and ran along the map",
    "On the way, the {animal} met many new friends who sang together",
    "They climbed small hills and crossed a little river, and the {sound} sound followed them",
    "At last they found a field of rainbow flowers that glowed",
    "The {animal} laughed and said, tomorrow we will go on another adventure",
];

/// 故事要素（动物、物品、拟声词）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoryCast {
    pub animal: &'static str,
    pub item: &'static str,
    pub sound: &'static str,
}

/// 由种子选出故事要素
///
/// 物品用反转后的种子选择，与动物的选择解耦
pub fn pick_cast(seed: &str, language: Language) -> StoryCast {
    let (animals, items, sounds) = match language {
        Language::Zh => (ZH_ANIMALS, ZH_ITEMS, ZH_SOUNDS),
        Language::En => (EN_ANIMALS, EN_ITEMS, EN_SOUNDS),
    };
    let reversed: String = seed.chars().rev().collect();
    let sound_key = format!("{}#", seed);

    StoryCast {
        animal: *stable_choice(seed, animals),
        item: *stable_choice(&reversed, items),
        sound: *stable_choice(&sound_key, sounds),
    }
}

/// 兜底故事句数：6 + (UTF-16 长度 mod 5)
pub fn sentence_count(seed: &str) -> usize {
    MIN_SENTENCES + seed.encode_utf16().count() % SENTENCE_SPAN
}

/// 生成兜底故事
pub fn fallback(seed: &str, language: Language) -> String {
    let cast = pick_cast(seed, language);
    let templates = match language {
        Language::Zh => &ZH_TEMPLATES,
        Language::En => &EN_TEMPLATES,
    };

    let sentences: Vec<String> = templates
        .iter()
        .take(sentence_count(seed))
        .map(|template| {
            template
                .replace("{animal}", cast.animal)
                .replace("{item}", cast.item)
                .replace("{sound}", cast.sound)
        })
        .collect();

    match language {
        Language::Zh => format!("{}。", sentences.join("。")),
        Language::En => format!("{}.", sentences.join(". ")),
    }
}
