//! Repositories wrapping database access, one per aggregate.

mod blocking;
mod conversation;
mod following;
mod message;
mod notification;
mod post;
mod report;
mod spotify_account;
mod user;
mod user_profile;

pub use blocking::BlockingRepository;
pub use conversation::ConversationRepository;
pub use following::FollowingRepository;
pub use message::MessageRepository;
pub use notification::NotificationRepository;
pub use post::PostRepository;
pub use report::ReportRepository;
pub use spotify_account::SpotifyAccountRepository;
pub use user::UserRepository;
pub use user_profile::UserProfileRepository;
