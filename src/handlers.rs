// Request handlers

use daybook_auth::{AuthError, IdentityStore, login, logout};
use daybook_core::logging::{debug, info};
use daybook_core::{Error, HttpRequest, HttpResponse, RequestContext};
use daybook_session::FLASH_KEY;
use daybook_validation::Validatable;
use std::sync::Arc;

use crate::forms::{BAD_CREDENTIALS, DUPLICATE_EMAIL, DayCreateForm, UserLoginForm, UserSignupForm};
use crate::models::{DayStore, ModelError, UserStore};
use crate::routes::App;
use crate::templates::TemplateData;

pub const SIGNUP_FLASH: &str = "Your signup was successful. Please log in.";
pub const DAY_CREATED_FLASH: &str = "Day successfully created!";
pub const LOGOUT_FLASH: &str = "You've been logged out successfully!";

pub async fn ping(_req: HttpRequest, _ctx: RequestContext) -> Result<HttpResponse, Error> {
    Ok(HttpResponse::ok().with_text("OK"))
}

pub async fn not_found(_req: HttpRequest, _ctx: RequestContext) -> Result<HttpResponse, Error> {
    Ok(HttpResponse::not_found().with_text("Not Found"))
}

pub async fn home(app: Arc<App>, _req: HttpRequest, ctx: RequestContext) -> Result<HttpResponse, Error> {
    let days = app.days.latest().await?;
    TemplateData::new("home", &ctx).with_days(days).render(200)
}

pub async fn day_view(
    app: Arc<App>,
    req: HttpRequest,
    ctx: RequestContext,
) -> Result<HttpResponse, Error> {
    let id = req.positive_id("id")?;
    let day = app.days.get(id).await?;
    TemplateData::new("view", &ctx).with_day(day).render(200)
}

pub async fn day_create(
    _app: Arc<App>,
    _req: HttpRequest,
    ctx: RequestContext,
) -> Result<HttpResponse, Error> {
    TemplateData::new("create", &ctx)
        .with_form(&DayCreateForm::default())?
        .render(200)
}

pub async fn day_create_post(
    app: Arc<App>,
    req: HttpRequest,
    ctx: RequestContext,
) -> Result<HttpResponse, Error> {
    let mut form: DayCreateForm = req.form()?;
    form.validate();

    if !form.valid() {
        return TemplateData::new("create", &ctx).with_form(&form)?.render(422);
    }

    let id = app.days.insert(form.to_new_day()?).await?;
    ctx.require_session()?.put(FLASH_KEY, DAY_CREATED_FLASH)?;
    debug!(day_id = id, "day created");

    Ok(HttpResponse::see_other(format!("/days/view/{}", id)))
}

pub async fn user_signup(
    _app: Arc<App>,
    _req: HttpRequest,
    ctx: RequestContext,
) -> Result<HttpResponse, Error> {
    TemplateData::new("signup", &ctx)
        .with_form(&UserSignupForm::default())?
        .render(200)
}

pub async fn user_signup_post(
    app: Arc<App>,
    req: HttpRequest,
    ctx: RequestContext,
) -> Result<HttpResponse, Error> {
    let mut form: UserSignupForm = req.form()?;
    form.validate();

    if !form.valid() {
        return TemplateData::new("signup", &ctx).with_form(&form)?.render(422);
    }

    match app.users.insert(&form.name, &form.email, &form.password).await {
        Ok(id) => info!(user_id = id, "account created"),
        Err(ModelError::DuplicateEmail) => {
            form.add_field_error("email", DUPLICATE_EMAIL);
            return TemplateData::new("signup", &ctx).with_form(&form)?.render(422);
        }
        Err(err) => return Err(err.into()),
    }

    ctx.require_session()?.put(FLASH_KEY, SIGNUP_FLASH)?;
    Ok(HttpResponse::see_other("/users/login"))
}

pub async fn user_login(
    _app: Arc<App>,
    _req: HttpRequest,
    ctx: RequestContext,
) -> Result<HttpResponse, Error> {
    TemplateData::new("login", &ctx)
        .with_form(&UserLoginForm::default())?
        .render(200)
}

pub async fn user_login_post(
    app: Arc<App>,
    req: HttpRequest,
    ctx: RequestContext,
) -> Result<HttpResponse, Error> {
    let mut form: UserLoginForm = req.form()?;
    form.validate();

    if !form.valid() {
        return TemplateData::new("login", &ctx).with_form(&form)?.render(422);
    }

    let id = match app.users.authenticate(&form.email, &form.password).await {
        Ok(id) => id,
        Err(AuthError::InvalidCredentials) => {
            form.add_non_field_error(BAD_CREDENTIALS);
            return TemplateData::new("login", &ctx).with_form(&form)?.render(422);
        }
        Err(err) => return Err(err.into()),
    };

    let destination = login(ctx.require_session()?, id).await?;
    info!(user_id = id, "signed in");
    Ok(HttpResponse::see_other(destination))
}

pub async fn user_logout_post(
    _app: Arc<App>,
    _req: HttpRequest,
    ctx: RequestContext,
) -> Result<HttpResponse, Error> {
    let session = ctx.require_session()?;
    logout(session).await?;
    session.put(FLASH_KEY, LOGOUT_FLASH)?;
    info!(user_id = ?ctx.user_id(), "signed out");
    Ok(HttpResponse::see_other("/"))
}

pub async fn account_view(
    app: Arc<App>,
    _req: HttpRequest,
    ctx: RequestContext,
) -> Result<HttpResponse, Error> {
    let Some(id) = ctx.user_id() else {
        return Ok(HttpResponse::see_other("/users/login"));
    };

    match app.users.get(id).await {
        Ok(user) => TemplateData::new("account", &ctx).with_user(user).render(200),
        Err(ModelError::NoRecord) => Ok(HttpResponse::see_other("/users/login")),
        Err(err) => Err(err.into()),
    }
}
