use async_graphql::{ComplexObject, Context, InputObject, Result, SimpleObject};
use serde::Serialize;
use sqlx::PgPool;

use crate::graphql::guards::LoggedIn;
use crate::models::attachment::Attachment;
use crate::models::content::{ContentHeader, ContentKind};
use crate::models::user::User;
use crate::models::DateTime;
use crate::publish::SnapshotKey;
use crate::util::{check_length, check_url, current_time, non_blank};

/// How many posts the front page snapshot holds.
pub const TOP_NEWS_COUNT: usize = 10;

const COLUMNS: &str = "id, category_id, title, content, image, link, attachments,
    created_user_id, revised_user_id, approved_user_id, approved,
    created_at, revised_at, approved_at";

/// A news post
#[derive(SimpleObject, sqlx::FromRow, Serialize, Clone, Debug)]
#[graphql(complex)]
pub struct News {
    /// The ID of the post
    pub id: i64,
    /// The category the post was filed under
    pub category_id: i64,
    /// The headline
    pub title: String,
    /// The body of the post
    pub content: String,
    /// An optional header image
    pub image: Option<String>,
    /// An optional link out to a related page
    pub link: Option<String>,
    pub created_user_id: i64,
    pub revised_user_id: Option<i64>,
    pub approved_user_id: Option<i64>,
    /// Whether the post is visible on the public site
    pub approved: bool,
    pub created_at: DateTime,
    pub revised_at: Option<DateTime>,
    pub approved_at: Option<DateTime>,

    #[graphql(skip)]
    #[serde(serialize_with = "Attachment::serialize_stored")]
    pub attachments: Option<String>,
}

#[ComplexObject]
impl News {
    /// Files attached to the post
    pub async fn attachments(&self) -> Vec<Attachment> {
        Attachment::parse_stored(self.attachments.as_deref())
    }

    /// Who wrote the post
    #[graphql(guard = "LoggedIn")]
    pub async fn created_user(&self, ctx: &Context<'_>) -> Result<User> {
        let pool: &PgPool = ctx.data_unchecked();
        User::with_id(self.created_user_id, pool).await
    }
}

#[derive(InputObject)]
pub struct NewNews {
    pub category_id: i64,
    pub title: String,
    pub content: String,
    pub image: Option<String>,
    pub link: Option<String>,
    /// A JSON list of `{url, name}` pairs
    pub attachments: Option<String>,
}

impl NewNews {
    pub fn validate(&self) -> Result<()> {
        check_length("title", &self.title, 1, 256)?;
        check_length("content", &self.content, 1, 100_000)?;
        if let Some(image) = non_blank(self.image.clone()) {
            check_url("image", &image)?;
        }
        if let Some(link) = non_blank(self.link.clone()) {
            check_url("link", &link)?;
        }

        Ok(())
    }
}

impl News {
    pub const KIND: ContentKind = ContentKind::News;

    pub async fn with_id(id: i64, pool: &PgPool) -> Result<Self> {
        Self::with_id_opt(id, pool)
            .await?
            .ok_or_else(|| Self::KIND.missing())
    }

    pub async fn with_id_opt(id: i64, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as(&format!("SELECT {} FROM news WHERE id = $1", COLUMNS))
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn all(pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as(&format!(
            "SELECT {} FROM news ORDER BY created_at DESC",
            COLUMNS
        ))
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn create(new_news: NewNews, user: &User, pool: &PgPool) -> Result<i64> {
        new_news.validate()?;
        let attachments = Attachment::normalize(new_news.attachments.as_deref())?;

        sqlx::query_scalar(
            "INSERT INTO news
                 (category_id, title, content, image, link, attachments, created_user_id, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING id",
        )
        .bind(new_news.category_id)
        .bind(new_news.title.trim())
        .bind(&new_news.content)
        .bind(non_blank(new_news.image))
        .bind(non_blank(new_news.link))
        .bind(attachments)
        .bind(user.id)
        .bind(current_time())
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Rewrites a row the caller has already loaded, sending it back to draft.
    pub async fn update(
        header: &ContentHeader,
        update: NewNews,
        user: &User,
        pool: &PgPool,
    ) -> Result<()> {
        update.validate()?;
        let attachments = Attachment::normalize(update.attachments.as_deref())?;

        let result = sqlx::query(
            "UPDATE news SET category_id = $1, title = $2, content = $3, image = $4, link = $5,
                 attachments = $6, approved = $10, revised_user_id = $7, revised_at = $8
             WHERE id = $9",
        )
        .bind(update.category_id)
        .bind(update.title.trim())
        .bind(&update.content)
        .bind(non_blank(update.image))
        .bind(non_blank(update.link))
        .bind(attachments)
        .bind(user.id)
        .bind(current_time())
        .bind(header.id)
        .bind(header.state().revise().is_public())
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Self::KIND.missing());
        }

        Ok(())
    }

    /// Every news mutation refreshes both news lists.
    pub fn snapshot_keys() -> Vec<SnapshotKey> {
        vec![SnapshotKey::NewsTop, SnapshotKey::NewsAll]
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use async_graphql::{EmptyMutation, EmptySubscription, Object, Schema};
    use time::macros::datetime;

    use super::*;

    pub fn mock_news() -> News {
        News {
            id: 1,
            category_id: 1,
            title: "Winter championships results".to_owned(),
            content: "Results are in.".to_owned(),
            image: None,
            link: None,
            created_user_id: 3,
            revised_user_id: None,
            approved_user_id: Some(1),
            approved: true,
            created_at: DateTime(datetime!(2026-12-14 18:30 UTC)),
            revised_at: None,
            approved_at: Some(DateTime(datetime!(2026-12-14 19:00 UTC))),
            attachments: None,
        }
    }

    struct FrontPage;

    #[Object]
    impl FrontPage {
        async fn news(&self) -> News {
            mock_news()
        }
    }

    #[tokio::test]
    async fn authors_are_hidden_from_anonymous_readers() {
        let schema = Schema::new(FrontPage, EmptyMutation, EmptySubscription);

        let public = schema.execute("{ news { title attachments { url } } }").await;
        assert!(public.errors.is_empty());

        let author = schema.execute("{ news { createdUser { email admin } } }").await;
        assert_eq!(author.errors[0].message, "Not authenticated");
    }

    fn post() -> NewNews {
        NewNews {
            category_id: 1,
            title: "Winter championships results".to_owned(),
            content: "Results are in.".to_owned(),
            image: None,
            link: Some(String::new()),
            attachments: Some("[]".to_owned()),
        }
    }

    #[test]
    fn blank_optional_links_pass() {
        assert!(post().validate().is_ok());
    }

    #[test]
    fn titles_are_required() {
        let news = NewNews {
            title: " ".to_owned(),
            ..post()
        };
        assert!(news.validate().is_err());
    }

    #[test]
    fn image_must_be_a_link() {
        let news = NewNews {
            image: Some("photo.jpg".to_owned()),
            ..post()
        };
        assert_eq!(
            news.validate().unwrap_err().message,
            "image must be a valid link"
        );
    }

    #[test]
    fn news_mutations_refresh_both_lists() {
        let keys: Vec<String> = News::snapshot_keys()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(keys, vec!["news_list_top", "news_list"]);
    }
}
