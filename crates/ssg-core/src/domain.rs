use std::{cmp::Ordering, fmt};

use chrono::{DateTime, Utc};

/// Chat account id (Slack `U…` / `B…` ids).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AccountId(pub String);

/// Conversation id (Slack channel / DM id, `D…`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConversationId(pub String);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Message timestamp token (`"<seconds>.<fraction>"`).
///
/// Doubles as message identity and as a history cursor. Ordering is numeric: the
/// integer part first, then the fraction compared as a right-padded decimal, so
/// `"100.5"` sorts after `"100.000100"`. Tokens that are not numeric sort after
/// all numeric ones, lexically among themselves.
#[derive(Clone, Debug, Eq)]
pub struct MessageTs(String);

impl MessageTs {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wall-clock time of the message, for logs. `None` for non-numeric tokens.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let (secs, frac) = self.parts()?;
        let micros = pad_fraction(frac, 6).parse::<u32>().ok()?;
        DateTime::from_timestamp(secs as i64, micros.saturating_mul(1_000))
    }

    fn parts(&self) -> Option<(u64, &str)> {
        let raw = self.0.trim();
        let (int, frac) = raw.split_once('.').unwrap_or((raw, ""));
        if !frac.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some((int.parse::<u64>().ok()?, frac))
    }
}

fn pad_fraction(frac: &str, width: usize) -> String {
    let mut s: String = frac.chars().take(width).collect();
    while s.len() < width {
        s.push('0');
    }
    s
}

impl PartialEq for MessageTs {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Ord for MessageTs {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.parts(), other.parts()) {
            (Some((a_int, a_frac)), Some((b_int, b_frac))) => a_int.cmp(&b_int).then_with(|| {
                let width = a_frac.len().max(b_frac.len());
                pad_fraction(a_frac, width).cmp(&pad_fraction(b_frac, width))
            }),
            // Non-numeric tokens rank after every numeric one.
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for MessageTs {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for MessageTs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A message as returned by the chat backend. Immutable once created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    /// `None` for system / integration messages without a user.
    pub author: Option<AccountId>,
    pub text: String,
    pub ts: MessageTs,
}

impl ChatMessage {
    pub fn is_from(&self, account: &AccountId) -> bool {
        self.author.as_ref() == Some(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_numerically_not_lexically() {
        assert!(MessageTs::new("99") < MessageTs::new("100"));
        assert!(MessageTs::new("100.000100") < MessageTs::new("100.5"));
        assert!(MessageTs::new("1700000000.000200") > MessageTs::new("1700000000.000199"));
        assert_eq!(MessageTs::new("105.10"), MessageTs::new("105.1"));
    }

    #[test]
    fn non_numeric_tokens_fall_back_to_lexical() {
        assert!(MessageTs::new("abc") < MessageTs::new("abd"));
        assert!(MessageTs::new("abc").to_datetime().is_none());
    }

    #[test]
    fn mixed_tokens_form_a_total_order() {
        let mut ts: Vec<MessageTs> = ["10x", "9", "10", "abc", "9.5"]
            .into_iter()
            .map(MessageTs::new)
            .collect();
        ts.sort();
        let sorted: Vec<&str> = ts.iter().map(MessageTs::as_str).collect();
        assert_eq!(sorted, ["9", "9.5", "10", "10x", "abc"]);

        assert!(MessageTs::new("9") < MessageTs::new("10x"));
        assert!(MessageTs::new("10") < MessageTs::new("10x"));
    }

    #[test]
    fn converts_to_wallclock() {
        let dt = MessageTs::new("1700000000.250000").to_datetime().unwrap();
        assert_eq!(dt.timestamp(), 1_700_000_000);
        assert_eq!(dt.timestamp_subsec_millis(), 250);
    }
}
