use super::store::Reducer;
use crate::db::models::{Post, User};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostsState {
    pub posts: Vec<Post>,
    pub selected_restaurant_id: Option<String>,
    pub is_loading: bool,
}

/// Partial changes applied to one post.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostUpdate {
    pub is_liked: Option<bool>,
    pub likes_count: Option<i64>,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub enum PostsAction {
    SetPosts(Vec<Post>),
    /// Newest posts go first.
    AddPost(Post),
    UpdatePost { id: String, update: PostUpdate },
    SetSelectedRestaurant(Option<String>),
    SetLoading(bool),
    /// Optimistic flip of the like flag with a matching ±1 on the count.
    ToggleLike(String),
}

impl PostsState {
    pub fn post(&self, id: &str) -> Option<&Post> {
        self.posts.iter().find(|p| p.id == id)
    }

    /// Posts for the selected restaurant, or every post when none is selected.
    pub fn visible_posts(&self) -> Vec<&Post> {
        match &self.selected_restaurant_id {
            Some(rid) => self.posts.iter().filter(|p| &p.restaurant_id == rid).collect(),
            None => self.posts.iter().collect(),
        }
    }
}

impl Reducer for PostsState {
    type Action = PostsAction;

    fn reduce(&mut self, action: PostsAction) {
        match action {
            PostsAction::SetPosts(posts) => self.posts = posts,
            PostsAction::AddPost(post) => self.posts.insert(0, post),
            PostsAction::UpdatePost { id, update } => {
                if let Some(post) = self.posts.iter_mut().find(|p| p.id == id) {
                    if let Some(liked) = update.is_liked {
                        post.is_liked = liked;
                    }
                    if let Some(count) = update.likes_count {
                        post.likes_count = count;
                    }
                    if let Some(description) = update.description {
                        post.description = Some(description);
                    }
                }
            }
            PostsAction::SetSelectedRestaurant(id) => self.selected_restaurant_id = id,
            PostsAction::SetLoading(loading) => self.is_loading = loading,
            PostsAction::ToggleLike(id) => {
                if let Some(post) = self.posts.iter_mut().find(|p| p.id == id) {
                    post.likes_count += if post.is_liked { -1 } else { 1 };
                    post.is_liked = !post.is_liked;
                }
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub user: Option<User>,
    pub is_loading: bool,
}

#[derive(Debug, Clone)]
pub enum SessionAction {
    SignedIn(User),
    SignedOut,
    SetLoading(bool),
}

impl Reducer for SessionState {
    type Action = SessionAction;

    fn reduce(&mut self, action: SessionAction) {
        match action {
            SessionAction::SignedIn(user) => {
                self.user = Some(user);
                self.is_loading = false;
            }
            SessionAction::SignedOut => {
                self.user = None;
                self.is_loading = false;
            }
            SessionAction::SetLoading(loading) => self.is_loading = loading,
        }
    }
}
