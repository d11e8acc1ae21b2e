/// Longest display name shown on the leaderboard and above agents.
pub const MAX_PLAYER_NAME_LENGTH: usize = 24;

/// Collapses whitespace, drops control characters and truncates to
/// `MAX_PLAYER_NAME_LENGTH` characters. Empty input yields `fallback`.
pub fn sanitize_player_name(name: &str, fallback: &str) -> String {
    let printable: String = name.chars().filter(|ch| !ch.is_control()).collect();
    let cleaned = printable.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        return fallback.to_string();
    }
    cleaned.chars().take(MAX_PLAYER_NAME_LENGTH).collect()
}
