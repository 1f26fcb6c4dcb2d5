//! 平台识别与录音格式协商

/// iOS / 微信内置浏览器优先的格式：容器兼容性最好的在前
const COMPAT_FIRST_MIMES: &[&str] = &[
    "audio/mp4;codecs=mp4a.40.2",
    "audio/mp4",
    "audio/aac",
    "audio/mpeg",
    "audio/webm;codecs=opus",
    "audio/webm",
];

/// 其它平台：压缩效率最高的在前
const EFFICIENT_FIRST_MIMES: &[&str] = &[
    "audio/webm;codecs=opus",
    "audio/webm",
    "audio/ogg;codecs=opus",
    "audio/mp4",
    "audio/mpeg",
    "audio/wav",
];

/// 客户端平台类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformClass {
    Ios,
    WeChat,
    Other,
}

impl PlatformClass {
    pub fn from_user_agent(user_agent: &str) -> Self {
        let ua = user_agent.to_ascii_lowercase();
        if ua.contains("micromessenger") {
            PlatformClass::WeChat
        } else if ua.contains("iphone") || ua.contains("ipad") || ua.contains("ipod") {
            PlatformClass::Ios
        } else {
            PlatformClass::Other
        }
    }

    /// 录音格式优先级
    pub fn recorder_mime_priority(&self) -> &'static [&'static str] {
        match self {
            PlatformClass::Ios | PlatformClass::WeChat => COMPAT_FIRST_MIMES,
            PlatformClass::Other => EFFICIENT_FIRST_MIMES,
        }
    }
}

/// 返回优先级列表中第一个受支持的 MIME
pub fn select_recorder_mime(
    platform: PlatformClass,
    is_supported: impl Fn(&str) -> bool,
) -> Option<&'static str> {
    platform
        .recorder_mime_priority()
        .iter()
        .copied()
        .find(|mime| is_supported(mime))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_user_agent() {
        let iphone = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15";
        assert_eq!(PlatformClass::from_user_agent(iphone), PlatformClass::Ios);

        let wechat = "Mozilla/5.0 (Linux; Android 13) MicroMessenger/8.0.40";
        assert_eq!(PlatformClass::from_user_agent(wechat), PlatformClass::WeChat);

        let chrome = "Mozilla/5.0 (X11; Linux x86_64) Chrome/120.0";
        assert_eq!(PlatformClass::from_user_agent(chrome), PlatformClass::Other);
    }

    #[test]
    fn test_select_prefers_platform_order() {
        let all = |_: &str| true;
        assert_eq!(
            select_recorder_mime(PlatformClass::Ios, all),
            Some("audio/mp4;codecs=mp4a.40.2")
        );
        assert_eq!(
            select_recorder_mime(PlatformClass::Other, all),
            Some("audio/webm;codecs=opus")
        );
    }

    #[test]
    fn test_select_skips_unsupported() {
        let only_mp4 = |m: &str| m == "audio/mp4";
        assert_eq!(
            select_recorder_mime(PlatformClass::Other, only_mp4),
            Some("audio/mp4")
        );
        assert_eq!(select_recorder_mime(PlatformClass::WeChat, |_| false), None);
    }
}
