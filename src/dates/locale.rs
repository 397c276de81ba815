//! Language tables for relative and free-form dates

/// Tokens a forum locale uses for human-readable dates
///
/// All tokens are lowercase; input is lowercased before matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateLocale {
    /// Locale name, for logs
    pub name: &'static str,

    /// Markers for "today"
    pub today: &'static [&'static str],

    /// Markers for "yesterday"
    pub yesterday: &'static [&'static str],

    /// Markers that, together with a minute marker, mean "N minutes ago"
    pub ago: &'static [&'static str],

    /// Minute markers (matched as substrings, so singular covers plural)
    pub minute: &'static [&'static str],

    /// Connector words removed before the free-form token scan (`" de "`)
    pub connectors: &'static [&'static str],

    /// Month names and abbreviations
    pub months: &'static [(&'static str, u32)],
}

impl DateLocale {
    pub const SPANISH: DateLocale = DateLocale {
        name: "es",
        today: &["hoy"],
        yesterday: &["ayer"],
        ago: &["hace"],
        minute: &["minuto"],
        connectors: &[" de "],
        months: &[
            ("enero", 1),
            ("ene", 1),
            ("feb", 2),
            ("febrero", 2),
            ("mar", 3),
            ("marzo", 3),
            ("abr", 4),
            ("abril", 4),
            ("may", 5),
            ("mayo", 5),
            ("jun", 6),
            ("junio", 6),
            ("jul", 7),
            ("julio", 7),
            ("ago", 8),
            ("agosto", 8),
            ("sep", 9),
            ("sept", 9),
            ("septiembre", 9),
            ("setiembre", 9),
            ("oct", 10),
            ("octubre", 10),
            ("nov", 11),
            ("noviembre", 11),
            ("dic", 12),
            ("diciembre", 12),
        ],
    };

    pub const ENGLISH: DateLocale = DateLocale {
        name: "en",
        today: &["today"],
        yesterday: &["yesterday"],
        ago: &["ago"],
        minute: &["minute"],
        connectors: &[" of "],
        months: &[
            ("january", 1),
            ("jan", 1),
            ("february", 2),
            ("feb", 2),
            ("march", 3),
            ("mar", 3),
            ("april", 4),
            ("apr", 4),
            ("may", 5),
            ("june", 6),
            ("jun", 6),
            ("july", 7),
            ("jul", 7),
            ("august", 8),
            ("aug", 8),
            ("september", 9),
            ("sept", 9),
            ("sep", 9),
            ("october", 10),
            ("oct", 10),
            ("november", 11),
            ("nov", 11),
            ("december", 12),
            ("dec", 12),
        ],
    };

    /// Looks up a month token, ignoring a trailing abbreviation dot
    pub fn month(&self, token: &str) -> Option<u32> {
        let token = token.trim_end_matches('.');
        self.months
            .iter()
            .find(|(name, _)| *name == token)
            .map(|(_, month)| *month)
    }

    /// Returns true if `token` is this locale's "ago" marker
    pub fn is_ago_marker(&self, token: &str) -> bool {
        self.ago.contains(&token)
    }

    pub fn mentions_today(&self, text: &str) -> bool {
        self.today.iter().any(|t| text.contains(t))
    }

    pub fn mentions_yesterday(&self, text: &str) -> bool {
        self.yesterday.iter().any(|t| text.contains(t))
    }

    pub fn mentions_minutes_ago(&self, text: &str) -> bool {
        self.ago.iter().any(|t| text.contains(t)) && self.minute.iter().any(|t| text.contains(t))
    }
}
