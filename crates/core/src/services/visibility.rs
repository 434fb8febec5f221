//! Visibility gate for profiles, posts, and friend lists.

use rhythme_common::AppResult;
use rhythme_db::{
    entities::user_profile::{self, PrivacySetting},
    repositories::{BlockingRepository, FollowingRepository, UserProfileRepository},
};

/// The profile sections that carry an independent privacy setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileSection {
    Profile,
    Posts,
    Friends,
}

/// Pure visibility rule, evaluated in order:
///
/// 1. Owner viewing themself is always allowed.
/// 2. A block in either direction denies, regardless of privacy setting.
/// 3. Otherwise the section's setting decides: `public` allows anyone,
///    `followers` requires the viewer to follow the owner, `private`
///    denies everyone but the owner.
#[must_use]
pub fn is_visibility_allowed(
    viewer_id: &str,
    owner_id: &str,
    setting: PrivacySetting,
    viewer_follows_owner: bool,
    blocked_either_direction: bool,
) -> bool {
    if viewer_id == owner_id {
        return true;
    }

    if blocked_either_direction {
        return false;
    }

    match setting {
        PrivacySetting::Public => true,
        PrivacySetting::Followers => viewer_follows_owner,
        PrivacySetting::Private => false,
    }
}

/// Visibility service resolving the gate against stored state.
#[derive(Clone)]
pub struct VisibilityService {
    profile_repo: UserProfileRepository,
    following_repo: FollowingRepository,
    blocking_repo: BlockingRepository,
}

impl VisibilityService {
    /// Create a new visibility service.
    #[must_use]
    pub const fn new(
        profile_repo: UserProfileRepository,
        following_repo: FollowingRepository,
        blocking_repo: BlockingRepository,
    ) -> Self {
        Self {
            profile_repo,
            following_repo,
            blocking_repo,
        }
    }

    /// Check whether `viewer_id` may see the given section of `owner_id`.
    ///
    /// A missing profile row is treated as all-public, matching the
    /// default setting.
    pub async fn can_view(
        &self,
        viewer_id: &str,
        owner_id: &str,
        section: ProfileSection,
    ) -> AppResult<bool> {
        if viewer_id == owner_id {
            return Ok(true);
        }

        let blocked = self
            .blocking_repo
            .is_blocked_between(viewer_id, owner_id)
            .await?;
        if blocked {
            return Ok(false);
        }

        let setting = self
            .profile_repo
            .find_by_user_id(owner_id)
            .await?
            .map_or(PrivacySetting::Public, |p| section_setting(&p, section));

        let follows = match setting {
            PrivacySetting::Followers => {
                self.following_repo
                    .is_following(viewer_id, owner_id)
                    .await?
            }
            _ => false,
        };

        Ok(is_visibility_allowed(
            viewer_id, owner_id, setting, follows, false,
        ))
    }
}

fn section_setting(profile: &user_profile::Model, section: ProfileSection) -> PrivacySetting {
    match section {
        ProfileSection::Profile => profile.profile_privacy,
        ProfileSection::Posts => profile.posts_privacy,
        ProfileSection::Friends => profile.friends_privacy,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_always_sees_self() {
        for setting in [
            PrivacySetting::Public,
            PrivacySetting::Followers,
            PrivacySetting::Private,
        ] {
            assert!(is_visibility_allowed("u1", "u1", setting, false, false));
        }
    }

    #[test]
    fn test_block_denies_even_public() {
        assert!(!is_visibility_allowed(
            "viewer",
            "owner",
            PrivacySetting::Public,
            true,
            true
        ));
    }

    #[test]
    fn test_public_allows_stranger() {
        assert!(is_visibility_allowed(
            "viewer",
            "owner",
            PrivacySetting::Public,
            false,
            false
        ));
    }

    #[test]
    fn test_followers_requires_follow() {
        assert!(!is_visibility_allowed(
            "viewer",
            "owner",
            PrivacySetting::Followers,
            false,
            false
        ));
        assert!(is_visibility_allowed(
            "viewer",
            "owner",
            PrivacySetting::Followers,
            true,
            false
        ));
    }

    #[test]
    fn test_private_denies_even_followers() {
        assert!(!is_visibility_allowed(
            "viewer",
            "owner",
            PrivacySetting::Private,
            true,
            false
        ));
    }
}
