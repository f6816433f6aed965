use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::practice::{DailyGoal, GoalType};

use super::{Permission, Role};

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub clerk_id: Option<String>,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub level: i64,
    pub xp: i64,
    pub streak: i64,
    pub answer_streak: i64,
    pub hearts: i64,
    pub last_login: Option<DateTime<Utc>>,
    pub daily_goal: DailyGoal,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone, Default)]
pub struct DbUser {
    pub id: Option<i64>,
    pub clerk_id: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<String>,
    pub level: Option<i64>,
    pub xp: Option<i64>,
    pub streak: Option<i64>,
    pub answer_streak: Option<i64>,
    pub hearts: Option<i64>,
    pub last_login: Option<NaiveDateTime>,
    pub daily_goal_type: Option<String>,
    pub daily_goal_target: Option<i64>,
    pub created_at: Option<NaiveDateTime>,
}

impl From<DbUser> for User {
    fn from(user: DbUser) -> Self {
        let goal_type = match user.daily_goal_type.as_deref() {
            Some("minutes") => GoalType::Minutes,
            _ => GoalType::Xp,
        };

        Self {
            id: user.id.unwrap_or_default(),
            clerk_id: user.clerk_id,
            email: user.email.unwrap_or_default(),
            username: user.username.unwrap_or_default(),
            first_name: user.first_name.unwrap_or_default(),
            last_name: user.last_name.unwrap_or_default(),
            role: user
                .role
                .and_then(|r| r.parse().ok())
                .unwrap_or(Role::Learner),
            level: user.level.unwrap_or(1),
            xp: user.xp.unwrap_or_default(),
            streak: user.streak.unwrap_or_default(),
            answer_streak: user.answer_streak.unwrap_or_default(),
            hearts: user.hearts.unwrap_or(crate::gamification::MAX_HEARTS),
            last_login: user
                .last_login
                .map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc)),
            daily_goal: DailyGoal {
                goal_type,
                target: user.daily_goal_target.unwrap_or(50),
            },
            created_at: user
                .created_at
                .map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc))
                .unwrap_or_else(Utc::now),
        }
    }
}

impl User {
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.role.has_permission(permission)
    }

    pub fn require_permission(&self, permission: Permission) -> Result<(), AppError> {
        if self.role.has_permission(permission) {
            Ok(())
        } else {
            tracing::warn!(
                username = %self.username,
                role = %self.role.as_str(),
                permission = ?permission,
                "Permission denied"
            );
            Err(AppError::Authorization(
                "You don't have permission to perform this action".to_string(),
            ))
        }
    }
}
