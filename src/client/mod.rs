//! Client-side state for DineSpot front-ends.
//!
//! State lives in explicit [`Store`]s owned by whoever builds a
//! [`ClientApp`]; views subscribe to the slices they render. Like toggles are
//! applied optimistically and reconciled with the server's answer.

pub mod api;
pub mod state;
pub mod store;

pub use api::{ApiClient, ClientError};
pub use state::{PostUpdate, PostsAction, PostsState, SessionAction, SessionState};
pub use store::{Reducer, Store, Subscription};

use crate::db::models::{LikeState, Post};
use crate::validation::CreatePostInput;

#[derive(Clone)]
pub struct ClientApp {
    pub api: ApiClient,
    pub posts: Store<PostsState>,
    pub session: Store<SessionState>,
}

impl ClientApp {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            posts: Store::default(),
            session: Store::new(SessionState {
                user: None,
                is_loading: true,
            }),
        }
    }

    pub async fn load_session(&self) {
        self.session.dispatch(SessionAction::SetLoading(true));
        match self.api.me().await {
            Ok(user) => self.session.dispatch(SessionAction::SignedIn(user)),
            Err(e) => {
                tracing::debug!("No active session: {}", e);
                self.session.dispatch(SessionAction::SignedOut);
            }
        }
    }

    pub async fn load_posts(&self) -> Result<(), ClientError> {
        self.posts.dispatch(PostsAction::SetLoading(true));
        let restaurant = self.posts.select(|s| s.selected_restaurant_id.clone());
        let result = self.api.posts(restaurant.as_deref()).await;
        self.posts.dispatch(PostsAction::SetLoading(false));

        self.posts.dispatch(PostsAction::SetPosts(result?));
        Ok(())
    }

    pub async fn create_post(&self, input: CreatePostInput) -> Result<Post, ClientError> {
        let post = self.api.create_post(&input).await?;
        self.posts.dispatch(PostsAction::AddPost(post.clone()));
        Ok(post)
    }

    /// Flip the like locally, then confirm with the server. On failure the
    /// local flip is undone.
    pub async fn toggle_like(&self, post_id: &str) -> Result<LikeState, ClientError> {
        self.posts
            .dispatch(PostsAction::ToggleLike(post_id.to_string()));

        match self.api.toggle_like(post_id).await {
            Ok(state) => {
                self.posts.dispatch(PostsAction::UpdatePost {
                    id: post_id.to_string(),
                    update: PostUpdate {
                        is_liked: Some(state.liked),
                        likes_count: Some(state.likes_count),
                        ..Default::default()
                    },
                });
                Ok(state)
            }
            Err(e) => {
                tracing::warn!(post_id, "Like toggle failed, reverting: {}", e);
                self.posts
                    .dispatch(PostsAction::ToggleLike(post_id.to_string()));
                Err(e)
            }
        }
    }

    pub fn select_restaurant(&self, restaurant_id: Option<String>) {
        self.posts
            .dispatch(PostsAction::SetSelectedRestaurant(restaurant_id));
    }
}
