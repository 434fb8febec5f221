//! Business logic services.

#![allow(missing_docs)]

pub mod account;
pub mod blocking;
pub mod email;
pub mod event_publisher;
pub mod following;
pub mod messaging;
pub mod notification;
pub mod post;
pub mod recommendation;
pub mod report;
pub mod spotify;
pub mod user;
pub mod visibility;

pub use account::{
    AccountService, ChangePasswordInput, LoginInput, RegisterInput, ResetPasswordInput,
};
pub use blocking::BlockingService;
pub use email::EmailService;
pub use event_publisher::{EventPublisher, EventPublisherService, NoOpEventPublisher};
pub use following::FollowingService;
pub use messaging::{MessagingService, SendMessageInput};
pub use notification::NotificationService;
pub use post::{CreateCommentInput, CreatePostInput, LikeOutcome, PostService, UpdatePostInput};
pub use recommendation::{FriendSuggestion, RecommendationService, ScoredPost};
pub use report::{ReportOutcome, ReportService, SubmitReportInput};
pub use spotify::{SpotifyItem, SpotifyService};
pub use user::{UpdatePrivacyInput, UpdateProfileInput, UserService};
pub use visibility::{ProfileSection, VisibilityService, is_visibility_allowed};
