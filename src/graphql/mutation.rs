use async_graphql::{Context, Object, Result};
use sqlx::PgPool;
use tracing::{error, info, warn};

use crate::email::send_email;
use crate::email::sponsorship::NewSponsorshipEmail;
use crate::email::MailSettings;
use crate::graphql::guards::{Admin, LoggedIn};
use crate::graphql::SUCCESS_MESSAGE;
use crate::models::category::{Category, NewCategory};
use crate::models::content::{ContentHeader, ContentKind};
use crate::models::group::Group;
use crate::models::live::{Live, NewLive};
use crate::models::meet::{Meet, NewMeet};
use crate::models::news::{NewNews, News};
use crate::models::permissions::{Action, NewPermission, Permission};
use crate::models::record::{NewRecord, Record};
use crate::models::seminar::{NewSeminar, Seminar};
use crate::models::sponsorship::{
    NewSponsorshipApplication, SponsorshipApplication, SponsorshipStatus,
};
use crate::models::user::{NewUser, Session, User};
use crate::publish::Publisher;

pub struct MutationRoot;

/// Checks the user may act on a new row filed under `category_id`.
async fn ensure_category(
    user: &User,
    action: Action,
    category_id: i64,
    pool: &PgPool,
) -> Result<()> {
    Category::with_id(category_id, pool).await?;
    user.ensure_can(action, category_id, pool).await
}

/// Loads an existing row and checks the user may perform `action` on it.
async fn checked(
    kind: ContentKind,
    id: i64,
    action: Action,
    user: &User,
    pool: &PgPool,
) -> Result<ContentHeader> {
    let header = kind.header(id, pool).await?;
    user.ensure_can(action, header.category_id, pool).await?;

    Ok(header)
}

/// Moving a row to another category needs revise rights in both.
async fn checked_revision(
    kind: ContentKind,
    id: i64,
    new_category_id: i64,
    user: &User,
    pool: &PgPool,
) -> Result<ContentHeader> {
    let header = checked(kind, id, Action::Revise, user, pool).await?;
    if new_category_id != header.category_id {
        ensure_category(user, Action::Revise, new_category_id, pool).await?;
    }

    Ok(header)
}

#[Object]
impl MutationRoot {
    /// Gets a login token on successful login
    pub async fn login(&self, ctx: &Context<'_>, email: String, password: String) -> Result<String> {
        let pool: &PgPool = ctx.data_unchecked();
        let user_id = User::check_login(&email, &password, pool)
            .await?
            .ok_or("Invalid email or password")?;

        let token = Session::get_or_generate_token(user_id, pool).await?;
        info!(user = user_id, "logged in");

        Ok(token)
    }

    /// Logs the user out
    #[graphql(guard = "LoggedIn")]
    pub async fn logout(&self, ctx: &Context<'_>) -> Result<&'static str> {
        let pool: &PgPool = ctx.data_unchecked();
        let user = ctx.data_unchecked::<User>();
        Session::remove(user.id, pool).await?;

        Ok(SUCCESS_MESSAGE)
    }

    #[graphql(guard = "Admin")]
    pub async fn register_user(&self, ctx: &Context<'_>, new_user: NewUser) -> Result<User> {
        let pool: &PgPool = ctx.data_unchecked();
        let id = User::register(new_user, pool).await?;
        info!(user = id, "registered user");

        User::with_id(id, pool).await
    }

    #[graphql(guard = "Admin")]
    pub async fn set_user_group(
        &self,
        ctx: &Context<'_>,
        user_id: i64,
        group_id: Option<i64>,
    ) -> Result<User> {
        let pool: &PgPool = ctx.data_unchecked();
        User::set_group(user_id, group_id, pool).await?;
        info!(user = user_id, group = ?group_id, "changed user group");

        User::with_id(user_id, pool).await
    }

    #[graphql(guard = "LoggedIn")]
    pub async fn create_news(&self, ctx: &Context<'_>, new_news: NewNews) -> Result<News> {
        let pool: &PgPool = ctx.data_unchecked();
        let user = ctx.data_unchecked::<User>();
        ensure_category(user, Action::Submit, new_news.category_id, pool).await?;

        let id = News::create(new_news, user, pool).await?;
        info!(id, user = user.id, "created news");

        let publisher = ctx.data_unchecked::<Publisher>();
        publisher.republish(&News::snapshot_keys(), pool).await;

        News::with_id(id, pool).await
    }

    #[graphql(guard = "LoggedIn")]
    pub async fn update_news(&self, ctx: &Context<'_>, id: i64, update: NewNews) -> Result<News> {
        let pool: &PgPool = ctx.data_unchecked();
        let user = ctx.data_unchecked::<User>();
        let header = checked_revision(News::KIND, id, update.category_id, user, pool).await?;

        News::update(&header, update, user, pool).await?;
        info!(id, user = user.id, "updated news");

        let publisher = ctx.data_unchecked::<Publisher>();
        publisher.republish(&News::snapshot_keys(), pool).await;

        News::with_id(id, pool).await
    }

    #[graphql(guard = "LoggedIn")]
    pub async fn approve_news(&self, ctx: &Context<'_>, id: i64) -> Result<News> {
        let pool: &PgPool = ctx.data_unchecked();
        let user = ctx.data_unchecked::<User>();
        let header = checked(News::KIND, id, Action::Approve, user, pool).await?;

        News::KIND.approve(&header, user, pool).await?;
        info!(id, user = user.id, "approved news");

        let publisher = ctx.data_unchecked::<Publisher>();
        publisher.republish(&News::snapshot_keys(), pool).await;

        News::with_id(id, pool).await
    }

    #[graphql(guard = "LoggedIn")]
    pub async fn delete_news(&self, ctx: &Context<'_>, id: i64) -> Result<&'static str> {
        let pool: &PgPool = ctx.data_unchecked();
        let user = ctx.data_unchecked::<User>();
        let header = checked(News::KIND, id, Action::Exclude, user, pool).await?;

        News::KIND.delete(&header, pool).await?;
        info!(id, user = user.id, "deleted news");

        let publisher = ctx.data_unchecked::<Publisher>();
        publisher.republish(&News::snapshot_keys(), pool).await;

        Ok(SUCCESS_MESSAGE)
    }

    #[graphql(guard = "LoggedIn")]
    pub async fn create_meet(&self, ctx: &Context<'_>, new_meet: NewMeet) -> Result<Meet> {
        let pool: &PgPool = ctx.data_unchecked();
        let user = ctx.data_unchecked::<User>();
        ensure_category(user, Action::Submit, new_meet.category_id, pool).await?;

        let id = Meet::create(new_meet, user, pool).await?;
        info!(id, user = user.id, "created meet");
        let meet = Meet::with_id(id, pool).await?;

        let publisher = ctx.data_unchecked::<Publisher>();
        publisher
            .republish(&Meet::snapshot_keys(None, Some(&meet)), pool)
            .await;

        Ok(meet)
    }

    #[graphql(guard = "LoggedIn")]
    pub async fn update_meet(&self, ctx: &Context<'_>, id: i64, update: NewMeet) -> Result<Meet> {
        let pool: &PgPool = ctx.data_unchecked();
        let user = ctx.data_unchecked::<User>();
        let header = checked_revision(Meet::KIND, id, update.category_id, user, pool).await?;
        let before = Meet::with_id(id, pool).await?;

        Meet::update(&header, update, user, pool).await?;
        info!(id, user = user.id, "updated meet");
        let after = Meet::with_id(id, pool).await?;

        let publisher = ctx.data_unchecked::<Publisher>();
        publisher
            .republish(&Meet::snapshot_keys(Some(&before), Some(&after)), pool)
            .await;

        Ok(after)
    }

    #[graphql(guard = "LoggedIn")]
    pub async fn approve_meet(&self, ctx: &Context<'_>, id: i64) -> Result<Meet> {
        let pool: &PgPool = ctx.data_unchecked();
        let user = ctx.data_unchecked::<User>();
        let header = checked(Meet::KIND, id, Action::Approve, user, pool).await?;

        Meet::KIND.approve(&header, user, pool).await?;
        info!(id, user = user.id, "approved meet");
        let meet = Meet::with_id(id, pool).await?;

        let publisher = ctx.data_unchecked::<Publisher>();
        publisher
            .republish(&Meet::snapshot_keys(None, Some(&meet)), pool)
            .await;

        Ok(meet)
    }

    #[graphql(guard = "LoggedIn")]
    pub async fn delete_meet(&self, ctx: &Context<'_>, id: i64) -> Result<&'static str> {
        let pool: &PgPool = ctx.data_unchecked();
        let user = ctx.data_unchecked::<User>();
        let header = checked(Meet::KIND, id, Action::Exclude, user, pool).await?;
        let before = Meet::with_id(id, pool).await?;

        Meet::KIND.delete(&header, pool).await?;
        info!(id, user = user.id, "deleted meet");

        let publisher = ctx.data_unchecked::<Publisher>();
        publisher
            .republish(&Meet::snapshot_keys(Some(&before), None), pool)
            .await;

        Ok(SUCCESS_MESSAGE)
    }

    #[graphql(guard = "LoggedIn")]
    pub async fn create_record(&self, ctx: &Context<'_>, new_record: NewRecord) -> Result<Record> {
        let pool: &PgPool = ctx.data_unchecked();
        let user = ctx.data_unchecked::<User>();
        ensure_category(user, Action::Submit, new_record.category_id, pool).await?;

        let id = Record::create(new_record, user, pool).await?;
        info!(id, user = user.id, "created record");
        let record = Record::with_id(id, pool).await?;

        let publisher = ctx.data_unchecked::<Publisher>();
        publisher
            .republish(&Record::snapshot_keys(None, Some(&record)), pool)
            .await;

        Ok(record)
    }

    #[graphql(guard = "LoggedIn")]
    pub async fn update_record(
        &self,
        ctx: &Context<'_>,
        id: i64,
        update: NewRecord,
    ) -> Result<Record> {
        let pool: &PgPool = ctx.data_unchecked();
        let user = ctx.data_unchecked::<User>();
        let header = checked_revision(Record::KIND, id, update.category_id, user, pool).await?;
        let before = Record::with_id(id, pool).await?;

        Record::update(&header, update, user, pool).await?;
        info!(id, user = user.id, "updated record");
        let after = Record::with_id(id, pool).await?;

        let publisher = ctx.data_unchecked::<Publisher>();
        publisher
            .republish(&Record::snapshot_keys(Some(&before), Some(&after)), pool)
            .await;

        Ok(after)
    }

    #[graphql(guard = "LoggedIn")]
    pub async fn approve_record(&self, ctx: &Context<'_>, id: i64) -> Result<Record> {
        let pool: &PgPool = ctx.data_unchecked();
        let user = ctx.data_unchecked::<User>();
        let header = checked(Record::KIND, id, Action::Approve, user, pool).await?;

        Record::KIND.approve(&header, user, pool).await?;
        info!(id, user = user.id, "approved record");
        let record = Record::with_id(id, pool).await?;

        let publisher = ctx.data_unchecked::<Publisher>();
        publisher
            .republish(&Record::snapshot_keys(None, Some(&record)), pool)
            .await;

        Ok(record)
    }

    #[graphql(guard = "LoggedIn")]
    pub async fn delete_record(&self, ctx: &Context<'_>, id: i64) -> Result<&'static str> {
        let pool: &PgPool = ctx.data_unchecked();
        let user = ctx.data_unchecked::<User>();
        let header = checked(Record::KIND, id, Action::Exclude, user, pool).await?;
        let before = Record::with_id(id, pool).await?;

        Record::KIND.delete(&header, pool).await?;
        info!(id, user = user.id, "deleted record");

        let publisher = ctx.data_unchecked::<Publisher>();
        publisher
            .republish(&Record::snapshot_keys(Some(&before), None), pool)
            .await;

        Ok(SUCCESS_MESSAGE)
    }

    #[graphql(guard = "LoggedIn")]
    pub async fn create_seminar(
        &self,
        ctx: &Context<'_>,
        new_seminar: NewSeminar,
    ) -> Result<Seminar> {
        let pool: &PgPool = ctx.data_unchecked();
        let user = ctx.data_unchecked::<User>();
        ensure_category(user, Action::Submit, new_seminar.category_id, pool).await?;

        let id = Seminar::create(new_seminar, user, pool).await?;
        info!(id, user = user.id, "created seminar");

        let publisher = ctx.data_unchecked::<Publisher>();
        publisher.republish(&Seminar::snapshot_keys(), pool).await;

        Seminar::with_id(id, pool).await
    }

    #[graphql(guard = "LoggedIn")]
    pub async fn update_seminar(
        &self,
        ctx: &Context<'_>,
        id: i64,
        update: NewSeminar,
    ) -> Result<Seminar> {
        let pool: &PgPool = ctx.data_unchecked();
        let user = ctx.data_unchecked::<User>();
        let header = checked_revision(Seminar::KIND, id, update.category_id, user, pool).await?;

        Seminar::update(&header, update, user, pool).await?;
        info!(id, user = user.id, "updated seminar");

        let publisher = ctx.data_unchecked::<Publisher>();
        publisher.republish(&Seminar::snapshot_keys(), pool).await;

        Seminar::with_id(id, pool).await
    }

    #[graphql(guard = "LoggedIn")]
    pub async fn approve_seminar(&self, ctx: &Context<'_>, id: i64) -> Result<Seminar> {
        let pool: &PgPool = ctx.data_unchecked();
        let user = ctx.data_unchecked::<User>();
        let header = checked(Seminar::KIND, id, Action::Approve, user, pool).await?;

        Seminar::KIND.approve(&header, user, pool).await?;
        info!(id, user = user.id, "approved seminar");

        let publisher = ctx.data_unchecked::<Publisher>();
        publisher.republish(&Seminar::snapshot_keys(), pool).await;

        Seminar::with_id(id, pool).await
    }

    #[graphql(guard = "LoggedIn")]
    pub async fn delete_seminar(&self, ctx: &Context<'_>, id: i64) -> Result<&'static str> {
        let pool: &PgPool = ctx.data_unchecked();
        let user = ctx.data_unchecked::<User>();
        let header = checked(Seminar::KIND, id, Action::Exclude, user, pool).await?;

        Seminar::KIND.delete(&header, pool).await?;
        info!(id, user = user.id, "deleted seminar");

        let publisher = ctx.data_unchecked::<Publisher>();
        publisher.republish(&Seminar::snapshot_keys(), pool).await;

        Ok(SUCCESS_MESSAGE)
    }

    #[graphql(guard = "LoggedIn")]
    pub async fn create_live(&self, ctx: &Context<'_>, new_live: NewLive) -> Result<Live> {
        let pool: &PgPool = ctx.data_unchecked();
        let user = ctx.data_unchecked::<User>();
        ensure_category(user, Action::Submit, new_live.category_id, pool).await?;

        let id = Live::create(new_live, user, pool).await?;
        info!(id, user = user.id, "created live stream");

        Live::with_id(id, pool).await
    }

    #[graphql(guard = "LoggedIn")]
    pub async fn update_live(&self, ctx: &Context<'_>, id: i64, update: NewLive) -> Result<Live> {
        let pool: &PgPool = ctx.data_unchecked();
        let user = ctx.data_unchecked::<User>();
        let header = checked_revision(Live::KIND, id, update.category_id, user, pool).await?;

        Live::update(&header, update, user, pool).await?;
        info!(id, user = user.id, "updated live stream");

        Live::with_id(id, pool).await
    }

    #[graphql(guard = "LoggedIn")]
    pub async fn approve_live(&self, ctx: &Context<'_>, id: i64) -> Result<Live> {
        let pool: &PgPool = ctx.data_unchecked();
        let user = ctx.data_unchecked::<User>();
        let header = checked(Live::KIND, id, Action::Approve, user, pool).await?;

        Live::KIND.approve(&header, user, pool).await?;
        info!(id, user = user.id, "approved live stream");

        Live::with_id(id, pool).await
    }

    #[graphql(guard = "LoggedIn")]
    pub async fn delete_live(&self, ctx: &Context<'_>, id: i64) -> Result<&'static str> {
        let pool: &PgPool = ctx.data_unchecked();
        let user = ctx.data_unchecked::<User>();
        let header = checked(Live::KIND, id, Action::Exclude, user, pool).await?;

        Live::KIND.delete(&header, pool).await?;
        info!(id, user = user.id, "deleted live stream");

        Ok(SUCCESS_MESSAGE)
    }

    #[graphql(guard = "Admin")]
    pub async fn create_category(
        &self,
        ctx: &Context<'_>,
        new_category: NewCategory,
    ) -> Result<Category> {
        let pool: &PgPool = ctx.data_unchecked();
        let id = Category::create(new_category, pool).await?;
        info!(id, "created category");

        Category::with_id(id, pool).await
    }

    #[graphql(guard = "Admin")]
    pub async fn update_category(
        &self,
        ctx: &Context<'_>,
        id: i64,
        update: NewCategory,
    ) -> Result<Category> {
        let pool: &PgPool = ctx.data_unchecked();
        Category::update(id, update, pool).await?;
        info!(id, "updated category");

        Category::with_id(id, pool).await
    }

    #[graphql(guard = "Admin")]
    pub async fn delete_category(&self, ctx: &Context<'_>, id: i64) -> Result<&'static str> {
        let pool: &PgPool = ctx.data_unchecked();
        Category::delete(id, pool).await?;
        info!(id, "deleted category");

        Ok(SUCCESS_MESSAGE)
    }

    #[graphql(guard = "Admin")]
    pub async fn create_group(&self, ctx: &Context<'_>, name: String) -> Result<Group> {
        let pool: &PgPool = ctx.data_unchecked();
        let id = Group::create(&name, pool).await?;
        info!(id, "created group");

        Group::with_id(id, pool).await
    }

    #[graphql(guard = "Admin")]
    pub async fn update_group(&self, ctx: &Context<'_>, id: i64, name: String) -> Result<Group> {
        let pool: &PgPool = ctx.data_unchecked();
        Group::rename(id, &name, pool).await?;
        info!(id, "renamed group");

        Group::with_id(id, pool).await
    }

    #[graphql(guard = "Admin")]
    pub async fn delete_group(&self, ctx: &Context<'_>, id: i64) -> Result<&'static str> {
        let pool: &PgPool = ctx.data_unchecked();
        Group::delete(id, pool).await?;
        info!(id, "deleted group");

        Ok(SUCCESS_MESSAGE)
    }

    #[graphql(guard = "Admin")]
    pub async fn set_permission(
        &self,
        ctx: &Context<'_>,
        permission: NewPermission,
    ) -> Result<Permission> {
        let pool: &PgPool = ctx.data_unchecked();
        let permission = Permission::set(permission, pool).await?;
        info!(
            group = permission.group_id,
            category = permission.category_id,
            "set permission"
        );

        Ok(permission)
    }

    #[graphql(guard = "Admin")]
    pub async fn remove_permission(
        &self,
        ctx: &Context<'_>,
        group_id: i64,
        category_id: i64,
    ) -> Result<&'static str> {
        let pool: &PgPool = ctx.data_unchecked();
        Permission::remove(group_id, category_id, pool).await?;
        info!(group = group_id, category = category_id, "removed permission");

        Ok(SUCCESS_MESSAGE)
    }

    /// Sends a sponsorship application to the federation office
    pub async fn submit_sponsorship_application(
        &self,
        ctx: &Context<'_>,
        application: NewSponsorshipApplication,
    ) -> Result<SponsorshipApplication> {
        let pool: &PgPool = ctx.data_unchecked();
        let id = SponsorshipApplication::submit(application, pool).await?;
        info!(id, "received sponsorship application");
        let application = SponsorshipApplication::with_id(id, pool).await?;

        let mail = ctx.data_unchecked::<MailSettings>();
        if mail.enabled {
            let email = NewSponsorshipEmail {
                application: &application,
                office_address: &mail.office_address,
            };
            if let Err(err) = send_email(email).await {
                error!(id, error = %err, "failed to send sponsorship notification");
            }
        } else {
            warn!(id, "mail is not configured, skipping sponsorship notification");
        }

        Ok(application)
    }

    #[graphql(guard = "Admin")]
    pub async fn set_sponsorship_status(
        &self,
        ctx: &Context<'_>,
        id: i64,
        status: SponsorshipStatus,
    ) -> Result<SponsorshipApplication> {
        let pool: &PgPool = ctx.data_unchecked();
        SponsorshipApplication::set_status(id, status, pool).await?;
        info!(id, ?status, "changed sponsorship status");

        SponsorshipApplication::with_id(id, pool).await
    }

    /// Rebuilds every public snapshot, returning how many were published
    #[graphql(guard = "Admin")]
    pub async fn republish_all(&self, ctx: &Context<'_>) -> Result<i64> {
        let pool: &PgPool = ctx.data_unchecked();
        let publisher = ctx.data_unchecked::<Publisher>();
        let published = publisher.republish_all(pool).await?;

        Ok(published as i64)
    }
}
