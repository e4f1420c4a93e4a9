use serde::Deserialize;

/// Row of `GET /stats/leaderboard/level/:id`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    #[serde(default)]
    pub rank: u32,
    pub user_id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub accuracy: u32,
    #[serde(default)]
    pub streak: u32,
}

/// Row of `GET /stats/users/:id/daily-progress`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyProgress {
    pub date: String,
    #[serde(default)]
    pub total_attempts: u32,
    #[serde(default)]
    pub correct_answers: u32,
    #[serde(default)]
    pub accuracy: u32,
}
