//! Page templates and the view models they render.

use askama::Template;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::app::forms::FormErrors;
use crate::app::pagination::Page;
use crate::domain::comment::Comment;
use crate::domain::group::Group;
use crate::domain::post::Post;
use crate::domain::user::User;
use crate::http::AuthUser;

pub struct PostView {
    pub id: String,
    pub url: String,
    pub text: String,
    pub created: String,
    pub author_username: String,
    pub group: Option<GroupLink>,
    pub image_url: Option<String>,
}

pub struct GroupLink {
    pub slug: String,
    pub title: String,
}

pub struct CommentView {
    pub id: String,
    pub author_username: String,
    pub text: String,
    pub created: String,
    pub can_delete: bool,
}

pub struct GroupOption {
    pub id: String,
    pub title: String,
    pub selected: bool,
}

impl PostView {
    pub fn new(post: Post, image_url: impl Fn(&str) -> String) -> Self {
        Self {
            id: post.id.to_string(),
            url: super::post_url(post.id),
            text: post.text,
            created: format_date(post.created_at),
            author_username: post.author_username,
            group: post.group.map(|group| GroupLink {
                slug: group.slug,
                title: group.title,
            }),
            image_url: post.image.as_deref().map(image_url),
        }
    }
}

impl CommentView {
    pub fn new(comment: Comment, viewer: Option<&AuthUser>) -> Self {
        Self {
            id: comment.id.to_string(),
            can_delete: viewer.map(|user| user.id == comment.author_id).unwrap_or(false),
            author_username: comment.author_username,
            text: comment.text,
            created: format_date(comment.created_at),
        }
    }
}

impl GroupOption {
    pub fn list(groups: Vec<Group>, selected: &str) -> Vec<Self> {
        groups
            .into_iter()
            .map(|group| {
                let id = group.id.to_string();
                Self {
                    selected: id == selected,
                    id,
                    title: group.title,
                }
            })
            .collect()
    }
}

fn format_date(value: OffsetDateTime) -> String {
    value
        .format(format_description!("[day] [month repr:long] [year]"))
        .unwrap_or_default()
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexPage {
    pub viewer: Option<AuthUser>,
    pub page: Page<PostView>,
}

#[derive(Template)]
#[template(path = "group_list.html")]
pub struct GroupPage {
    pub viewer: Option<AuthUser>,
    pub group: Group,
    pub page: Page<PostView>,
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfilePage {
    pub viewer: Option<AuthUser>,
    pub author: User,
    pub author_name: String,
    pub page: Page<PostView>,
    pub following: bool,
    /// Whether to offer follow/unfollow at all.
    pub can_follow: bool,
}

#[derive(Template)]
#[template(path = "post_detail.html")]
pub struct PostDetailPage {
    pub viewer: Option<AuthUser>,
    pub post: PostView,
    pub author_posts: u64,
    pub comments: Vec<CommentView>,
    pub can_edit: bool,
}

#[derive(Template)]
#[template(path = "create_post.html")]
pub struct PostFormPage {
    pub viewer: Option<AuthUser>,
    pub is_edit: bool,
    pub action: String,
    pub text: String,
    pub groups: Vec<GroupOption>,
    pub current_image: Option<String>,
    pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "follow.html")]
pub struct FollowPage {
    pub viewer: Option<AuthUser>,
    pub page: Page<PostView>,
}

#[derive(Template)]
#[template(path = "signup.html")]
pub struct SignupPage {
    pub viewer: Option<AuthUser>,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginPage {
    pub viewer: Option<AuthUser>,
    pub username: String,
    pub next: String,
    pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "404.html")]
pub struct NotFoundPage {
    pub viewer: Option<AuthUser>,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorPage {
    pub viewer: Option<AuthUser>,
    pub status: u16,
    pub message: String,
}
