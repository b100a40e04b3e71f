use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use url::Url;

use crate::auth::{Principal, SessionResolver};
use crate::database::{tables, Db, Query};
use crate::error::{ApiError, StoreResultExt};
use crate::models::{Profile, ScoreRow};
use crate::services::{now, optional_text, required_text};

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 30;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScoreBucket {
    pub score: u8,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProfileStats {
    pub ratings_count: u64,
    pub reviews_count: u64,
    pub collections_count: u64,
    /// One bucket per whole point, 0 through 10
    pub rating_distribution: Vec<ScoreBucket>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    #[serde(flatten)]
    pub profile: Profile,
    pub followers_count: u64,
    pub following_count: u64,
    pub stats: ProfileStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_following: Option<bool>,
}

/// Body of `PATCH /api/profile/me`. An empty string clears a field.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub website_url: Option<String>,
    pub avatar_url: Option<String>,
}

impl ProfileUpdate {
    /// Patch document for the present fields, without the timestamp.
    pub fn into_patch(self) -> Result<Map<String, Value>, ApiError> {
        if let Some(url) = self.website_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            validate_web_url(url)?;
        }

        let mut patch = Map::new();
        for (column, value) in [
            ("display_name", self.display_name),
            ("bio", self.bio),
            ("website_url", self.website_url),
            ("avatar_url", self.avatar_url),
        ] {
            if let Some(value) = value {
                let value = value.trim();
                let value = if value.is_empty() {
                    Value::Null
                } else {
                    Value::String(value.to_string())
                };
                patch.insert(column.to_string(), value);
            }
        }

        if patch.is_empty() {
            return Err(ApiError::invalid_request("No profile fields to update"));
        }
        Ok(patch)
    }
}

fn validate_web_url(raw: &str) -> Result<(), ApiError> {
    let invalid = || ApiError::validation("website_url", "Website URL must be a valid http(s) URL");
    let url = Url::parse(raw).map_err(|_| invalid())?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(()),
        _ => Err(invalid()),
    }
}

/// Body of `POST /api/auth/profile`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SignupProfileInput {
    pub user_id: Option<String>,
    pub username: Option<String>,
    #[serde(alias = "display_name")]
    pub display_name: Option<String>,
}

pub fn validate_username(username: &str) -> Result<(), ApiError> {
    let len = username.chars().count();
    let allowed = username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) || !allowed {
        return Err(ApiError::validation(
            "username",
            format!(
                "Username must be {}-{} characters of letters, numbers or underscores",
                USERNAME_MIN, USERNAME_MAX
            ),
        ));
    }
    Ok(())
}

/// Rating distribution over whole-point buckets. Fractional scores fall into
/// the bucket of their integer part.
pub fn distribution(scores: &[f64]) -> Vec<ScoreBucket> {
    let mut counts = [0u64; 11];
    for score in scores {
        let bucket = score.floor().clamp(0.0, 10.0) as usize;
        counts[bucket] += 1;
    }
    counts
        .iter()
        .enumerate()
        .map(|(score, &count)| ScoreBucket {
            score: score as u8,
            count,
        })
        .collect()
}

async fn stats(db: &Db, user_id: &str) -> Result<ProfileStats, ApiError> {
    let scores_query = Query::table(tables::RATINGS)
        .select(&["score"])
        .eq("user_id", user_id);
    let reviews_query = Query::table(tables::REVIEWS).eq("user_id", user_id);
    let collections_query = Query::table(tables::COLLECTIONS).eq("user_id", user_id);

    let (scores, reviews_count, collections_count) = futures::try_join!(
        db.select::<ScoreRow>(&scores_query),
        db.count(&reviews_query),
        db.count(&collections_query),
    )
    .context("Failed to fetch profile statistics")?;

    let scores: Vec<f64> = scores.into_iter().map(|r| r.score).collect();
    Ok(ProfileStats {
        ratings_count: scores.len() as u64,
        reviews_count,
        collections_count,
        rating_distribution: distribution(&scores),
    })
}

async fn enrich(db: &Db, profile: Profile, viewer: Option<&Principal>) -> Result<ProfileView, ApiError> {
    let followers_query = Query::table(tables::FOLLOWS).eq("following_id", profile.id.as_str());
    let following_query = Query::table(tables::FOLLOWS).eq("follower_id", profile.id.as_str());

    let (counts, stats) = futures::join!(
        async {
            futures::try_join!(db.count(&followers_query), db.count(&following_query))
                .context("Failed to fetch profile")
        },
        stats(db, &profile.id),
    );
    let (followers_count, following_count) = counts?;
    let stats = stats?;

    let is_following = match viewer {
        Some(viewer) => Some(
            db.exists(
                &Query::table(tables::FOLLOWS)
                    .eq("follower_id", viewer.id.as_str())
                    .eq("following_id", profile.id.as_str()),
            )
            .await
            .context("Failed to fetch profile")?,
        ),
        None => None,
    };

    Ok(ProfileView {
        profile,
        followers_count,
        following_count,
        stats,
        is_following,
    })
}

/// The caller's own profile.
pub async fn me(db: &Db, principal: &Principal) -> Result<ProfileView, ApiError> {
    let profile: Profile = db
        .select_one(&Query::table(tables::PROFILES).eq("id", principal.id.as_str()))
        .await
        .context("Failed to fetch profile")?
        .ok_or_else(|| ApiError::not_found("Profile not found"))?;
    enrich(db, profile, None).await
}

/// A public profile. `is_following` is present only when a caller is known.
pub async fn by_username(db: &Db, viewer: Option<&Principal>, username: &str) -> Result<ProfileView, ApiError> {
    let profile: Profile = db
        .select_one(&Query::table(tables::PROFILES).eq("username", username))
        .await
        .context("Failed to fetch profile")?
        .ok_or_else(|| ApiError::not_found("Profile not found"))?;
    enrich(db, profile, viewer).await
}

pub async fn update(db: &Db, principal: &Principal, changes: ProfileUpdate) -> Result<Profile, ApiError> {
    let mut patch = changes.into_patch()?;
    patch.insert("updated_at".to_string(), json!(now()));

    db.update(
        &Query::table(tables::PROFILES).eq("id", principal.id.as_str()),
        &Value::Object(patch),
    )
    .await
    .context("Failed to update profile")?
    .ok_or_else(|| ApiError::not_found("Profile not found"))
}

/// Create the profile row for a freshly signed-up user. Runs under the
/// elevated credential, so every precondition is checked here.
pub async fn create_for_signup(
    db: &Db,
    sessions: &dyn SessionResolver,
    input: SignupProfileInput,
) -> Result<Profile, ApiError> {
    const CONTEXT: &str = "Failed to create profile";
    let user_id = required_text(input.user_id, "userId", "User ID is required")?;
    let username = required_text(input.username, "username", "Username is required")?;
    validate_username(&username)?;
    let display_name = optional_text(input.display_name).unwrap_or_else(|| username.clone());

    let known = sessions
        .principal_exists(&user_id)
        .await
        .map_err(|e| ApiError::unexpected(format!("user lookup failed: {}", e)))?;
    if !known {
        return Err(ApiError::not_found("User not found"));
    }

    let username_query = Query::table(tables::PROFILES).eq("username", username.as_str());
    let profile_query = Query::table(tables::PROFILES).eq("id", user_id.as_str());
    let (taken, existing) = futures::try_join!(db.exists(&username_query), db.exists(&profile_query))
    .context(CONTEXT)?;
    if existing {
        return Err(ApiError::invalid_request("Profile already exists"));
    }
    if taken {
        return Err(ApiError::validation("username", "Username is already taken"));
    }

    let timestamp = now();
    db.insert(
        tables::PROFILES,
        &json!({
            "id": user_id,
            "username": username,
            "display_name": display_name,
            "created_at": timestamp,
            "updated_at": timestamp,
        }),
    )
    .await
    .context(CONTEXT)
}
