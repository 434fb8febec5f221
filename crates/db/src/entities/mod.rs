//! SeaORM entities, one per table.

pub mod blocking;
pub mod conversation;
pub mod following;
pub mod message;
pub mod notification;
pub mod post;
pub mod post_comment;
pub mod post_like;
pub mod report;
pub mod spotify_account;
pub mod user;
pub mod user_profile;

pub use blocking::Entity as Blocking;
pub use conversation::Entity as Conversation;
pub use following::Entity as Following;
pub use message::Entity as Message;
pub use notification::Entity as Notification;
pub use post::Entity as Post;
pub use post_comment::Entity as PostComment;
pub use post_like::Entity as PostLike;
pub use report::Entity as Report;
pub use spotify_account::Entity as SpotifyAccount;
pub use user::Entity as User;
pub use user_profile::Entity as UserProfile;
