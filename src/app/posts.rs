use uuid::Uuid;

use crate::app::error::{ServiceError, ServiceResult};
use crate::app::forms::PostForm;
use crate::app::media::MediaService;
use crate::app::pagination::{Page, Paginator};
use crate::domain::comment::Comment;
use crate::domain::group::Group;
use crate::domain::post::{NewPost, Post, PostChanges, PostFilter};
use crate::domain::repo::Repositories;
use crate::domain::user::User;

#[derive(Clone)]
pub struct PostService {
    repos: Repositories,
    media: MediaService,
    paginator: Paginator,
}

pub struct GroupFeed {
    pub group: Group,
    pub page: Page<Post>,
}

pub struct ProfileFeed {
    pub author: User,
    pub page: Page<Post>,
    /// Whether the viewer follows this author. Never true on one's own profile.
    pub following: bool,
}

pub struct PostDetail {
    pub post: Post,
    pub comments: Vec<Comment>,
    pub author_posts: u64,
}

impl PostService {
    pub fn new(repos: Repositories, media: MediaService, paginator: Paginator) -> Self {
        Self {
            repos,
            media,
            paginator,
        }
    }

    async fn page(&self, filter: PostFilter, requested: Option<&str>) -> ServiceResult<Page<Post>> {
        let total = self.repos.posts.count(filter).await?;
        let window = self.paginator.window(total as usize, requested);
        let items = if window.limit == 0 {
            Vec::new()
        } else {
            self.repos
                .posts
                .list(filter, window.limit as u64, window.offset as u64)
                .await?
        };
        Ok(window.into_page(items))
    }

    pub async fn latest(&self, requested: Option<&str>) -> ServiceResult<Page<Post>> {
        self.page(PostFilter::All, requested).await
    }

    pub async fn group_feed(&self, slug: &str, requested: Option<&str>) -> ServiceResult<GroupFeed> {
        let group = self
            .repos
            .groups
            .get_by_slug(slug)
            .await?
            .ok_or(ServiceError::NotFound("group"))?;
        let page = self.page(PostFilter::Group(group.id), requested).await?;
        Ok(GroupFeed { group, page })
    }

    pub async fn profile_feed(
        &self,
        username: &str,
        viewer_id: Option<Uuid>,
        requested: Option<&str>,
    ) -> ServiceResult<ProfileFeed> {
        let author = self
            .repos
            .users
            .get_by_username(username)
            .await?
            .ok_or(ServiceError::NotFound("user"))?;
        let page = self.page(PostFilter::Author(author.id), requested).await?;

        let following = match viewer_id {
            Some(viewer_id) if viewer_id != author.id => {
                self.repos.follows.exists(viewer_id, author.id).await?
            }
            _ => false,
        };

        Ok(ProfileFeed {
            author,
            page,
            following,
        })
    }

    pub async fn followed_feed(
        &self,
        follower_id: Uuid,
        requested: Option<&str>,
    ) -> ServiceResult<Page<Post>> {
        self.page(PostFilter::FollowedBy(follower_id), requested).await
    }

    pub async fn detail(&self, post_id: Uuid) -> ServiceResult<PostDetail> {
        let post = self
            .repos
            .posts
            .get(post_id)
            .await?
            .ok_or(ServiceError::NotFound("post"))?;
        let comments = self.repos.comments.list_for_post(post.id).await?;
        let author_posts = self
            .repos
            .posts
            .count(PostFilter::Author(post.author_id))
            .await?;

        Ok(PostDetail {
            post,
            comments,
            author_posts,
        })
    }

    pub async fn groups(&self) -> ServiceResult<Vec<Group>> {
        Ok(self.repos.groups.list().await?)
    }

    pub async fn create(&self, author_id: Uuid, form: PostForm) -> ServiceResult<Post> {
        let (group_id, image) = self.validate(&form, None).await?;

        let post = self
            .repos
            .posts
            .create(NewPost {
                text: form.text,
                author_id,
                group_id,
                image,
            })
            .await?;

        tracing::info!(post_id = %post.id, author_id = %author_id, "post created");
        Ok(post)
    }

    /// Loads a post for editing; only its author gets it back.
    pub async fn editable(&self, post_id: Uuid, editor_id: Uuid) -> ServiceResult<Post> {
        let post = self
            .repos
            .posts
            .get(post_id)
            .await?
            .ok_or(ServiceError::NotFound("post"))?;
        if post.author_id != editor_id {
            return Err(ServiceError::NotOwner { post_id: post.id });
        }
        Ok(post)
    }

    pub async fn edit(&self, post_id: Uuid, editor_id: Uuid, form: PostForm) -> ServiceResult<Post> {
        let current = self.editable(post_id, editor_id).await?;
        let (group_id, uploaded) = self.validate(&form, current.image.as_deref()).await?;

        let image = match uploaded {
            Some(key) => Some(key),
            None if form.clear_image => None,
            None => current.image,
        };

        let post = self
            .repos
            .posts
            .update(
                current.id,
                PostChanges {
                    text: form.text,
                    group_id,
                    image,
                },
            )
            .await?
            .ok_or(ServiceError::NotFound("post"))?;

        tracing::info!(post_id = %post.id, "post updated");
        Ok(post)
    }

    /// Resolves the group and stores the image only once every field is
    /// valid, so a rejected form leaves nothing behind.
    async fn validate(
        &self,
        form: &PostForm,
        current_image: Option<&str>,
    ) -> ServiceResult<(Option<Uuid>, Option<String>)> {
        let mut errors = form.check();

        let group_id = match form.group.trim() {
            "" => None,
            raw => {
                let found = match Uuid::parse_str(raw) {
                    Ok(id) => self.repos.groups.get(id).await?.map(|group| group.id),
                    Err(_) => None,
                };
                if found.is_none() {
                    errors.add(
                        "group",
                        "Select a valid choice. That choice is not one of the available choices.",
                    );
                }
                found
            }
        };

        let checked = match form.image.clone() {
            Some(upload) => match self.media.check_image(upload) {
                Ok(checked) => Some(checked),
                Err(ServiceError::Validation(image_errors)) => {
                    for message in image_errors.field("image") {
                        errors.add("image", message.clone());
                    }
                    None
                }
                Err(err) => return Err(err),
            },
            None => None,
        };

        if form.clear_image && checked.is_some() && current_image.is_some() {
            errors.add(
                "image",
                "Please either submit a file or check the clear checkbox, not both.",
            );
        }

        if !errors.is_empty() {
            return Err(ServiceError::Validation(errors));
        }

        let image = match checked {
            Some(checked) => Some(self.media.store(checked).await?),
            None => None,
        };

        Ok((group_id, image))
    }
}

