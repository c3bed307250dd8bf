use async_graphql::{Context, Object, Result};
use sqlx::PgPool;

use crate::graphql::guards::Admin;
use crate::graphql::visibility;
use crate::models::category::Category;
use crate::models::content::ContentKind;
use crate::models::group::Group;
use crate::models::live::Live;
use crate::models::meet::{Meet, MeetKind, PoolLength};
use crate::models::news::News;
use crate::models::permissions::Permission;
use crate::models::record::{AgeCategory, Record};
use crate::models::seminar::Seminar;
use crate::models::sponsorship::SponsorshipApplication;
use crate::models::user::User;

pub struct QueryRoot;

/// Drafts the viewer can't see are reported as missing.
async fn visible<T>(
    ctx: &Context<'_>,
    kind: ContentKind,
    row: T,
    header: impl Fn(&T) -> (i64, bool),
) -> Result<T> {
    let (category_id, approved) = header(&row);
    if visibility(ctx, true).await?.shows(category_id, approved) {
        Ok(row)
    } else {
        Err(kind.missing())
    }
}

#[Object]
impl QueryRoot {
    /// The user tied to the provided token, if any
    pub async fn user<'c>(&self, ctx: &'c Context<'c>) -> Option<User> {
        ctx.data_opt::<User>().cloned()
    }

    pub async fn news(&self, ctx: &Context<'_>, id: i64) -> Result<News> {
        let pool: &PgPool = ctx.data_unchecked();
        let news = News::with_id(id, pool).await?;
        visible(ctx, News::KIND, news, |n| (n.category_id, n.approved)).await
    }

    /// News posts, newest first
    pub async fn news_list(
        &self,
        ctx: &Context<'_>,
        #[graphql(default)] include_drafts: bool,
    ) -> Result<Vec<News>> {
        let pool: &PgPool = ctx.data_unchecked();
        let visibility = visibility(ctx, include_drafts).await?;

        Ok(News::all(pool)
            .await?
            .into_iter()
            .filter(|news| visibility.shows(news.category_id, news.approved))
            .collect())
    }

    pub async fn meet(&self, ctx: &Context<'_>, id: i64) -> Result<Meet> {
        let pool: &PgPool = ctx.data_unchecked();
        let meet = Meet::with_id(id, pool).await?;
        visible(ctx, Meet::KIND, meet, |m| (m.category_id, m.approved)).await
    }

    /// Meets by start date, optionally for one year or kind
    pub async fn meets(
        &self,
        ctx: &Context<'_>,
        year: Option<i32>,
        kind: Option<MeetKind>,
        #[graphql(default)] include_drafts: bool,
    ) -> Result<Vec<Meet>> {
        let pool: &PgPool = ctx.data_unchecked();
        let visibility = visibility(ctx, include_drafts).await?;

        Ok(Meet::matching(year, kind, pool)
            .await?
            .into_iter()
            .filter(|meet| visibility.shows(meet.category_id, meet.approved))
            .collect())
    }

    pub async fn record(&self, ctx: &Context<'_>, id: i64) -> Result<Record> {
        let pool: &PgPool = ctx.data_unchecked();
        let record = Record::with_id(id, pool).await?;
        visible(ctx, Record::KIND, record, |r| (r.category_id, r.approved)).await
    }

    pub async fn records(
        &self,
        ctx: &Context<'_>,
        age_category: Option<AgeCategory>,
        pool: Option<PoolLength>,
        #[graphql(default)] include_drafts: bool,
    ) -> Result<Vec<Record>> {
        let db: &PgPool = ctx.data_unchecked();
        let visibility = visibility(ctx, include_drafts).await?;

        Ok(Record::matching(age_category, pool, db)
            .await?
            .into_iter()
            .filter(|record| visibility.shows(record.category_id, record.approved))
            .collect())
    }

    pub async fn seminar(&self, ctx: &Context<'_>, id: i64) -> Result<Seminar> {
        let pool: &PgPool = ctx.data_unchecked();
        let seminar = Seminar::with_id(id, pool).await?;
        visible(ctx, Seminar::KIND, seminar, |s| (s.category_id, s.approved)).await
    }

    pub async fn seminars(
        &self,
        ctx: &Context<'_>,
        #[graphql(default)] include_drafts: bool,
    ) -> Result<Vec<Seminar>> {
        let pool: &PgPool = ctx.data_unchecked();
        let visibility = visibility(ctx, include_drafts).await?;

        Ok(Seminar::all(pool)
            .await?
            .into_iter()
            .filter(|seminar| visibility.shows(seminar.category_id, seminar.approved))
            .collect())
    }

    pub async fn live(&self, ctx: &Context<'_>, id: i64) -> Result<Live> {
        let pool: &PgPool = ctx.data_unchecked();
        let live = Live::with_id(id, pool).await?;
        visible(ctx, Live::KIND, live, |l| (l.category_id, l.approved)).await
    }

    pub async fn lives(
        &self,
        ctx: &Context<'_>,
        #[graphql(default)] include_drafts: bool,
    ) -> Result<Vec<Live>> {
        let pool: &PgPool = ctx.data_unchecked();
        let visibility = visibility(ctx, include_drafts).await?;

        Ok(Live::all(pool)
            .await?
            .into_iter()
            .filter(|live| visibility.shows(live.category_id, live.approved))
            .collect())
    }

    pub async fn categories(&self, ctx: &Context<'_>) -> Result<Vec<Category>> {
        let pool: &PgPool = ctx.data_unchecked();
        Category::all(pool).await
    }

    #[graphql(guard = "Admin")]
    pub async fn groups(&self, ctx: &Context<'_>) -> Result<Vec<Group>> {
        let pool: &PgPool = ctx.data_unchecked();
        Group::all(pool).await
    }

    #[graphql(guard = "Admin")]
    pub async fn permissions(&self, ctx: &Context<'_>, group_id: i64) -> Result<Vec<Permission>> {
        let pool: &PgPool = ctx.data_unchecked();
        Group::with_id(group_id, pool).await?;
        Permission::for_group(group_id, pool).await
    }

    #[graphql(guard = "Admin")]
    pub async fn users(&self, ctx: &Context<'_>) -> Result<Vec<User>> {
        let pool: &PgPool = ctx.data_unchecked();
        User::all(pool).await
    }

    #[graphql(guard = "Admin")]
    pub async fn sponsorship_applications(
        &self,
        ctx: &Context<'_>,
    ) -> Result<Vec<SponsorshipApplication>> {
        let pool: &PgPool = ctx.data_unchecked();
        SponsorshipApplication::all(pool).await
    }
}
