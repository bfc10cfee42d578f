use async_trait::async_trait;

use crate::models::*;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("not found")] NotFound,
    #[error("conflict")] Conflict,
    #[error("internal: {0}")] Internal(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Fails with `Conflict` when the username is taken.
    async fn create_user(&self, new: NewUser) -> RepoResult<User>;
    async fn get_user(&self, id: Id) -> RepoResult<User>;
    /// The user together with their stored password hash.
    async fn find_credentials(&self, username: &str) -> RepoResult<(User, String)>;
    async fn update_user(&self, id: Id, upd: UpdateUser) -> RepoResult<User>;
}

#[async_trait]
pub trait PostRepo: Send + Sync {
    /// Posts matching `query` (case-insensitive substring of title, content or
    /// category; `None` matches all), newest first.
    async fn search_posts(&self, query: Option<&str>) -> RepoResult<Vec<Post>>;
    async fn list_posts_by_author(&self, author: Id) -> RepoResult<Vec<Post>>;
    async fn get_post(&self, id: Id) -> RepoResult<Post>;
    async fn create_post(&self, author: Id, fields: PostFields) -> RepoResult<Post>;
    async fn update_post(&self, id: Id, fields: PostFields) -> RepoResult<Post>;
    /// Removes the post, its comments and every like membership attached to them.
    async fn delete_post(&self, id: Id) -> RepoResult<()>;
}

#[async_trait]
pub trait CommentRepo: Send + Sync {
    async fn list_comments(&self) -> RepoResult<Vec<Comment>>;
    /// Oldest first, the order they are read in under a post.
    async fn list_comments_for_post(&self, post: Id) -> RepoResult<Vec<Comment>>;
    async fn list_comments_by_author(&self, author: Id) -> RepoResult<Vec<Comment>>;
    async fn get_comment(&self, id: Id) -> RepoResult<Comment>;
    async fn create_comment(&self, post: Id, author: Id, content: String) -> RepoResult<Comment>;
    async fn update_comment(&self, id: Id, content: String) -> RepoResult<Comment>;
    async fn delete_comment(&self, id: Id) -> RepoResult<()>;
}

/// Like-set membership. Each toggle returns whether the user is a member afterwards.
#[async_trait]
pub trait LikeRepo: Send + Sync {
    async fn toggle_post_like(&self, post: Id, user: Id) -> RepoResult<bool>;
    async fn toggle_comment_like(&self, comment: Id, user: Id) -> RepoResult<bool>;
}

pub trait Repo: UserRepo + PostRepo + CommentRepo + LikeRepo {}

impl<T> Repo for T where T: UserRepo + PostRepo + CommentRepo + LikeRepo {}

/// Case-insensitive substring match over the searchable post fields.
pub fn post_matches(post: &Post, needle_lower: &str) -> bool {
    post.title.to_lowercase().contains(needle_lower)
        || post.content.to_lowercase().contains(needle_lower)
        || post
            .category
            .as_deref()
            .is_some_and(|c| c.to_lowercase().contains(needle_lower))
}

#[cfg(feature = "inmem-store")]
pub mod inmem {
    use super::*;
    use chrono::Utc;
    use serde::{Deserialize, Serialize};
    use std::collections::{BTreeMap, BTreeSet};
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
    use tracing::{info, warn};

    /// Rows as stored; like-sets live in the join sets, not on the rows.
    #[derive(Clone, Serialize, Deserialize)]
    struct PostRow {
        id: Id,
        author: Id,
        fields: PostFieldsRow,
        created_at: chrono::DateTime<Utc>,
    }

    #[derive(Clone, Serialize, Deserialize)]
    struct PostFieldsRow {
        title: String,
        content: String,
        category: Option<String>,
        image: Option<String>,
    }

    #[derive(Clone, Serialize, Deserialize)]
    struct CommentRow {
        id: Id,
        post: Id,
        author: Id,
        content: String,
        created_at: chrono::DateTime<Utc>,
    }

    #[derive(Default, Serialize, Deserialize)]
    struct State {
        users: BTreeMap<Id, User>,
        passwords: BTreeMap<Id, String>,
        posts: BTreeMap<Id, PostRow>,
        comments: BTreeMap<Id, CommentRow>,
        /// (post id, user id)
        post_likes: BTreeSet<(Id, Id)>,
        /// (comment id, user id)
        comment_likes: BTreeSet<(Id, Id)>,
        next_id: Id,
    }

    impl State {
        fn next_id(&mut self) -> Id {
            self.next_id += 1;
            self.next_id
        }

        fn likers(set: &BTreeSet<(Id, Id)>, id: Id) -> Vec<Id> {
            set.range((id, Id::MIN)..=(id, Id::MAX)).map(|(_, u)| *u).collect()
        }

        fn post(&self, row: &PostRow) -> Post {
            Post {
                id: row.id,
                author: row.author,
                title: row.fields.title.clone(),
                content: row.fields.content.clone(),
                category: row.fields.category.clone(),
                image: row.fields.image.clone(),
                created_at: row.created_at,
                likes: Self::likers(&self.post_likes, row.id),
            }
        }

        fn comment(&self, row: &CommentRow) -> Comment {
            Comment {
                id: row.id,
                post: row.post,
                author: row.author,
                content: row.content.clone(),
                created_at: row.created_at,
                likes: Self::likers(&self.comment_likes, row.id),
            }
        }

        fn username_taken(&self, username: &str, except: Option<Id>) -> bool {
            self.users
                .values()
                .any(|u| u.username == username && Some(u.id) != except)
        }

        fn toggle(set: &mut BTreeSet<(Id, Id)>, key: (Id, Id)) -> bool {
            if set.remove(&key) {
                false
            } else {
                set.insert(key);
                true
            }
        }
    }

    impl From<PostFields> for PostFieldsRow {
        fn from(f: PostFields) -> Self {
            Self { title: f.title, content: f.content, category: f.category, image: f.image }
        }
    }

    /// Repository held in memory, rewritten to a JSON snapshot after each mutation.
    #[derive(Clone)]
    pub struct InMemRepo {
        state: Arc<RwLock<State>>,
        snapshot_path: Option<Arc<PathBuf>>,
    }

    impl InMemRepo {
        /// Loads the snapshot at `path` if one exists; later mutations are written back there.
        pub fn open(path: impl Into<PathBuf>) -> Self {
            let path = path.into();
            let state = Self::load_state_from(&path);
            Self {
                state: Arc::new(RwLock::new(state)),
                snapshot_path: Some(Arc::new(path)),
            }
        }

        /// Never touches the filesystem.
        pub fn ephemeral() -> Self {
            Self { state: Arc::new(RwLock::new(State::default())), snapshot_path: None }
        }

        fn load_state_from(path: &Path) -> State {
            match std::fs::read(path) {
                Ok(bytes) => match serde_json::from_slice::<State>(&bytes) {
                    Ok(s) => {
                        info!("loaded snapshot '{}'", path.display());
                        s
                    }
                    Err(e) => {
                        warn!("failed to parse snapshot '{}': {e}. Starting empty.", path.display());
                        State::default()
                    }
                },
                Err(e) => {
                    info!("no snapshot at '{}' ({e}), starting empty", path.display());
                    State::default()
                }
            }
        }

        fn read(&self) -> RepoResult<RwLockReadGuard<'_, State>> {
            self.state.read().map_err(|_| RepoError::Internal("state lock poisoned".into()))
        }

        fn write(&self) -> RepoResult<RwLockWriteGuard<'_, State>> {
            self.state.write().map_err(|_| RepoError::Internal("state lock poisoned".into()))
        }

        /// Called with the write guard still held so snapshots land in mutation order.
        fn persist(&self, state: &State) {
            let Some(path) = self.snapshot_path.as_deref() else { return };
            let bytes = match serde_json::to_vec_pretty(state) {
                Ok(b) => b,
                Err(e) => {
                    warn!("failed to encode snapshot: {e}");
                    return;
                }
            };
            if let Some(dir) = path.parent() {
                let _ = std::fs::create_dir_all(dir);
            }
            if let Err(e) = std::fs::write(path, bytes) {
                warn!("failed to write snapshot '{}': {e}", path.display());
            }
        }
    }

    #[async_trait]
    impl UserRepo for InMemRepo {
        async fn create_user(&self, new: NewUser) -> RepoResult<User> {
            let mut s = self.write()?;
            if s.username_taken(&new.username, None) {
                return Err(RepoError::Conflict);
            }
            let id = s.next_id();
            let user = User { id, username: new.username, email: new.email, date_joined: Utc::now() };
            s.users.insert(id, user.clone());
            s.passwords.insert(id, new.password_hash);
            self.persist(&s);
            Ok(user)
        }
        async fn get_user(&self, id: Id) -> RepoResult<User> {
            self.read()?.users.get(&id).cloned().ok_or(RepoError::NotFound)
        }
        async fn find_credentials(&self, username: &str) -> RepoResult<(User, String)> {
            let s = self.read()?;
            let user = s.users.values().find(|u| u.username == username).ok_or(RepoError::NotFound)?;
            let hash = s.passwords.get(&user.id).ok_or(RepoError::NotFound)?;
            Ok((user.clone(), hash.clone()))
        }
        async fn update_user(&self, id: Id, upd: UpdateUser) -> RepoResult<User> {
            let mut s = self.write()?;
            if s.username_taken(&upd.username, Some(id)) {
                return Err(RepoError::Conflict);
            }
            let user = s.users.get_mut(&id).ok_or(RepoError::NotFound)?;
            user.username = upd.username;
            user.email = upd.email;
            let updated = user.clone();
            self.persist(&s);
            Ok(updated)
        }
    }

    #[async_trait]
    impl PostRepo for InMemRepo {
        async fn search_posts(&self, query: Option<&str>) -> RepoResult<Vec<Post>> {
            let s = self.read()?;
            let needle = query.map(str::to_lowercase);
            let mut v: Vec<Post> = s
                .posts
                .values()
                .map(|r| s.post(r))
                .filter(|p| needle.as_deref().map_or(true, |n| post_matches(p, n)))
                .collect();
            newest_first(&mut v, |p| p.created_at);
            Ok(v)
        }
        async fn list_posts_by_author(&self, author: Id) -> RepoResult<Vec<Post>> {
            let s = self.read()?;
            let mut v: Vec<Post> = s.posts.values().filter(|r| r.author == author).map(|r| s.post(r)).collect();
            newest_first(&mut v, |p| p.created_at);
            Ok(v)
        }
        async fn get_post(&self, id: Id) -> RepoResult<Post> {
            let s = self.read()?;
            s.posts.get(&id).map(|r| s.post(r)).ok_or(RepoError::NotFound)
        }
        async fn create_post(&self, author: Id, fields: PostFields) -> RepoResult<Post> {
            let mut s = self.write()?;
            if !s.users.contains_key(&author) { return Err(RepoError::NotFound); }
            let id = s.next_id();
            let row = PostRow { id, author, fields: fields.into(), created_at: Utc::now() };
            let post = s.post(&row);
            s.posts.insert(id, row);
            self.persist(&s);
            Ok(post)
        }
        async fn update_post(&self, id: Id, fields: PostFields) -> RepoResult<Post> {
            let mut s = self.write()?;
            let row = s.posts.get_mut(&id).ok_or(RepoError::NotFound)?;
            row.fields = fields.into();
            let row = row.clone();
            let post = s.post(&row);
            self.persist(&s);
            Ok(post)
        }
        async fn delete_post(&self, id: Id) -> RepoResult<()> {
            let mut s = self.write()?;
            if s.posts.remove(&id).is_none() { return Err(RepoError::NotFound); }
            let orphaned: Vec<Id> = s.comments.values().filter(|c| c.post == id).map(|c| c.id).collect();
            for cid in &orphaned {
                s.comments.remove(cid);
            }
            s.comment_likes.retain(|(cid, _)| !orphaned.contains(cid));
            s.post_likes.retain(|(pid, _)| *pid != id);
            self.persist(&s);
            Ok(())
        }
    }

    #[async_trait]
    impl CommentRepo for InMemRepo {
        async fn list_comments(&self) -> RepoResult<Vec<Comment>> {
            let s = self.read()?;
            let mut v: Vec<Comment> = s.comments.values().map(|r| s.comment(r)).collect();
            newest_first(&mut v, |c| c.created_at);
            Ok(v)
        }
        async fn list_comments_for_post(&self, post: Id) -> RepoResult<Vec<Comment>> {
            let s = self.read()?;
            let mut v: Vec<Comment> = s.comments.values().filter(|r| r.post == post).map(|r| s.comment(r)).collect();
            v.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            Ok(v)
        }
        async fn list_comments_by_author(&self, author: Id) -> RepoResult<Vec<Comment>> {
            let s = self.read()?;
            let mut v: Vec<Comment> = s.comments.values().filter(|r| r.author == author).map(|r| s.comment(r)).collect();
            newest_first(&mut v, |c| c.created_at);
            Ok(v)
        }
        async fn get_comment(&self, id: Id) -> RepoResult<Comment> {
            let s = self.read()?;
            s.comments.get(&id).map(|r| s.comment(r)).ok_or(RepoError::NotFound)
        }
        async fn create_comment(&self, post: Id, author: Id, content: String) -> RepoResult<Comment> {
            let mut s = self.write()?;
            if !s.posts.contains_key(&post) || !s.users.contains_key(&author) {
                return Err(RepoError::NotFound);
            }
            let id = s.next_id();
            let row = CommentRow { id, post, author, content, created_at: Utc::now() };
            let comment = s.comment(&row);
            s.comments.insert(id, row);
            self.persist(&s);
            Ok(comment)
        }
        async fn update_comment(&self, id: Id, content: String) -> RepoResult<Comment> {
            let mut s = self.write()?;
            let row = s.comments.get_mut(&id).ok_or(RepoError::NotFound)?;
            row.content = content;
            let row = row.clone();
            let comment = s.comment(&row);
            self.persist(&s);
            Ok(comment)
        }
        async fn delete_comment(&self, id: Id) -> RepoResult<()> {
            let mut s = self.write()?;
            if s.comments.remove(&id).is_none() { return Err(RepoError::NotFound); }
            s.comment_likes.retain(|(cid, _)| *cid != id);
            self.persist(&s);
            Ok(())
        }
    }

    #[async_trait]
    impl LikeRepo for InMemRepo {
        async fn toggle_post_like(&self, post: Id, user: Id) -> RepoResult<bool> {
            let mut s = self.write()?;
            if !s.posts.contains_key(&post) { return Err(RepoError::NotFound); }
            let liked = State::toggle(&mut s.post_likes, (post, user));
            self.persist(&s);
            Ok(liked)
        }
        async fn toggle_comment_like(&self, comment: Id, user: Id) -> RepoResult<bool> {
            let mut s = self.write()?;
            if !s.comments.contains_key(&comment) { return Err(RepoError::NotFound); }
            let liked = State::toggle(&mut s.comment_likes, (comment, user));
            self.persist(&s);
            Ok(liked)
        }
    }

}

// Postgres implementation (feature = "postgres-store")
#[cfg(feature = "postgres-store")]
pub mod pg {
    use super::*;
    use sqlx::{Pool, Postgres};

    fn internal(e: sqlx::Error) -> RepoError {
        match e {
            sqlx::Error::RowNotFound => RepoError::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => RepoError::Conflict,
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => RepoError::NotFound,
            other => RepoError::Internal(other.to_string()),
        }
    }

    const POST_SELECT: &str = r#"
        SELECT p.id, p.author, p.title, p.content, p.category, p.image, p.created_at,
               COALESCE(
                   (SELECT array_agg(l.user_id ORDER BY l.user_id) FROM post_likes l WHERE l.post_id = p.id),
                   '{}'
               ) AS likes
        FROM posts p
    "#;

    const COMMENT_SELECT: &str = r#"
        SELECT c.id, c.post, c.author, c.content, c.created_at,
               COALESCE(
                   (SELECT array_agg(l.user_id ORDER BY l.user_id) FROM comment_likes l WHERE l.comment_id = c.id),
                   '{}'
               ) AS likes
        FROM comments c
    "#;

    #[derive(Clone)]
    pub struct PgRepo { pool: Pool<Postgres> }

    impl PgRepo {
        pub fn new(pool: Pool<Postgres>) -> Self { Self { pool } }

        pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
            sqlx::migrate!("./migrations").run(&self.pool).await
        }

        async fn post_where(&self, clause: &str, id: Id) -> RepoResult<Post> {
            sqlx::query_as::<_, Post>(&format!("{POST_SELECT} WHERE {clause}"))
                .bind(id)
                .fetch_one(&self.pool)
                .await
                .map_err(internal)
        }

        async fn comment_by_id(&self, id: Id) -> RepoResult<Comment> {
            sqlx::query_as::<_, Comment>(&format!("{COMMENT_SELECT} WHERE c.id = $1"))
                .bind(id)
                .fetch_one(&self.pool)
                .await
                .map_err(internal)
        }
    }

    #[async_trait]
    impl UserRepo for PgRepo {
        async fn create_user(&self, new: NewUser) -> RepoResult<User> {
            sqlx::query_as::<_, User>(
                "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3)
                 RETURNING id, username, email, date_joined",
            )
            .bind(&new.username)
            .bind(&new.email)
            .bind(&new.password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(internal)
        }
        async fn get_user(&self, id: Id) -> RepoResult<User> {
            sqlx::query_as::<_, User>("SELECT id, username, email, date_joined FROM users WHERE id = $1")
                .bind(id)
                .fetch_one(&self.pool)
                .await
                .map_err(internal)
        }
        async fn find_credentials(&self, username: &str) -> RepoResult<(User, String)> {
            let user = sqlx::query_as::<_, User>(
                "SELECT id, username, email, date_joined FROM users WHERE username = $1",
            )
            .bind(username)
            .fetch_one(&self.pool)
            .await
            .map_err(internal)?;
            let hash: String = sqlx::query_scalar("SELECT password_hash FROM users WHERE id = $1")
                .bind(user.id)
                .fetch_one(&self.pool)
                .await
                .map_err(internal)?;
            Ok((user, hash))
        }
        async fn update_user(&self, id: Id, upd: UpdateUser) -> RepoResult<User> {
            sqlx::query_as::<_, User>(
                "UPDATE users SET username = $2, email = $3 WHERE id = $1
                 RETURNING id, username, email, date_joined",
            )
            .bind(id)
            .bind(&upd.username)
            .bind(&upd.email)
            .fetch_one(&self.pool)
            .await
            .map_err(internal)
        }
    }

    #[async_trait]
    impl PostRepo for PgRepo {
        async fn search_posts(&self, query: Option<&str>) -> RepoResult<Vec<Post>> {
            // strpos avoids LIKE wildcard escaping; id breaks created_at ties in insertion order
            sqlx::query_as::<_, Post>(&format!(
                "{POST_SELECT}
                 WHERE $1::text IS NULL
                    OR strpos(lower(p.title), lower($1)) > 0
                    OR strpos(lower(p.content), lower($1)) > 0
                    OR strpos(lower(COALESCE(p.category, '')), lower($1)) > 0
                 ORDER BY p.created_at DESC, p.id ASC"
            ))
            .bind(query)
            .fetch_all(&self.pool)
            .await
            .map_err(internal)
        }
        async fn list_posts_by_author(&self, author: Id) -> RepoResult<Vec<Post>> {
            sqlx::query_as::<_, Post>(&format!(
                "{POST_SELECT} WHERE p.author = $1 ORDER BY p.created_at DESC, p.id ASC"
            ))
            .bind(author)
            .fetch_all(&self.pool)
            .await
            .map_err(internal)
        }
        async fn get_post(&self, id: Id) -> RepoResult<Post> {
            self.post_where("p.id = $1", id).await
        }
        async fn create_post(&self, author: Id, fields: PostFields) -> RepoResult<Post> {
            let id: Id = sqlx::query_scalar(
                "INSERT INTO posts (author, title, content, category, image) VALUES ($1, $2, $3, $4, $5) RETURNING id",
            )
            .bind(author)
            .bind(&fields.title)
            .bind(&fields.content)
            .bind(&fields.category)
            .bind(&fields.image)
            .fetch_one(&self.pool)
            .await
            .map_err(internal)?;
            self.get_post(id).await
        }
        async fn update_post(&self, id: Id, fields: PostFields) -> RepoResult<Post> {
            let done = sqlx::query(
                "UPDATE posts SET title = $2, content = $3, category = $4, image = $5 WHERE id = $1",
            )
            .bind(id)
            .bind(&fields.title)
            .bind(&fields.content)
            .bind(&fields.category)
            .bind(&fields.image)
            .execute(&self.pool)
            .await
            .map_err(internal)?;
            if done.rows_affected() == 0 { return Err(RepoError::NotFound); }
            self.get_post(id).await
        }
        async fn delete_post(&self, id: Id) -> RepoResult<()> {
            // comments and like rows go with it via ON DELETE CASCADE
            let done = sqlx::query("DELETE FROM posts WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(internal)?;
            if done.rows_affected() == 0 { return Err(RepoError::NotFound); }
            Ok(())
        }
    }

    #[async_trait]
    impl CommentRepo for PgRepo {
        async fn list_comments(&self) -> RepoResult<Vec<Comment>> {
            sqlx::query_as::<_, Comment>(&format!("{COMMENT_SELECT} ORDER BY c.created_at DESC, c.id ASC"))
                .fetch_all(&self.pool)
                .await
                .map_err(internal)
        }
        async fn list_comments_for_post(&self, post: Id) -> RepoResult<Vec<Comment>> {
            sqlx::query_as::<_, Comment>(&format!(
                "{COMMENT_SELECT} WHERE c.post = $1 ORDER BY c.created_at ASC, c.id ASC"
            ))
            .bind(post)
            .fetch_all(&self.pool)
            .await
            .map_err(internal)
        }
        async fn list_comments_by_author(&self, author: Id) -> RepoResult<Vec<Comment>> {
            sqlx::query_as::<_, Comment>(&format!(
                "{COMMENT_SELECT} WHERE c.author = $1 ORDER BY c.created_at DESC, c.id ASC"
            ))
            .bind(author)
            .fetch_all(&self.pool)
            .await
            .map_err(internal)
        }
        async fn get_comment(&self, id: Id) -> RepoResult<Comment> {
            self.comment_by_id(id).await
        }
        async fn create_comment(&self, post: Id, author: Id, content: String) -> RepoResult<Comment> {
            let id: Id = sqlx::query_scalar(
                "INSERT INTO comments (post, author, content) VALUES ($1, $2, $3) RETURNING id",
            )
            .bind(post)
            .bind(author)
            .bind(&content)
            .fetch_one(&self.pool)
            .await
            .map_err(internal)?;
            self.comment_by_id(id).await
        }
        async fn update_comment(&self, id: Id, content: String) -> RepoResult<Comment> {
            let done = sqlx::query("UPDATE comments SET content = $2 WHERE id = $1")
                .bind(id)
                .bind(&content)
                .execute(&self.pool)
                .await
                .map_err(internal)?;
            if done.rows_affected() == 0 { return Err(RepoError::NotFound); }
            self.comment_by_id(id).await
        }
        async fn delete_comment(&self, id: Id) -> RepoResult<()> {
            let done = sqlx::query("DELETE FROM comments WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(internal)?;
            if done.rows_affected() == 0 { return Err(RepoError::NotFound); }
            Ok(())
        }
    }

    #[async_trait]
    impl LikeRepo for PgRepo {
        async fn toggle_post_like(&self, post: Id, user: Id) -> RepoResult<bool> {
            let removed = sqlx::query("DELETE FROM post_likes WHERE post_id = $1 AND user_id = $2")
                .bind(post)
                .bind(user)
                .execute(&self.pool)
                .await
                .map_err(internal)?;
            if removed.rows_affected() > 0 { return Ok(false); }
            sqlx::query("INSERT INTO post_likes (post_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
                .bind(post)
                .bind(user)
                .execute(&self.pool)
                .await
                .map_err(internal)?;
            Ok(true)
        }
        async fn toggle_comment_like(&self, comment: Id, user: Id) -> RepoResult<bool> {
            let removed = sqlx::query("DELETE FROM comment_likes WHERE comment_id = $1 AND user_id = $2")
                .bind(comment)
                .bind(user)
                .execute(&self.pool)
                .await
                .map_err(internal)?;
            if removed.rows_affected() > 0 { return Ok(false); }
            sqlx::query("INSERT INTO comment_likes (comment_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
                .bind(comment)
                .bind(user)
                .execute(&self.pool)
                .await
                .map_err(internal)?;
            Ok(true)
        }
    }
}
