use std::collections::HashMap;

use actix_web::http::header;
use actix_web::{get, post, web, HttpRequest, HttpResponse};
use bson::oid::ObjectId;
use serde::Deserialize;
use tera::Context;

use crate::auth::{hash_password, verify_password, CurrentUser, SessionSigner};
use crate::balance::compute_group_balance;
use crate::error::{AppError, StoreError, UniqueField};
use crate::flash::{self, FlashMessage};
use crate::schemas::{Expense, Group, GroupId, Membership, User, UserId, MAX_AMOUNT};
use crate::store::Store;
use crate::views::{balance_views, expense_views, GroupView, UserView, Views};

type Response = Result<HttpResponse, AppError>;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(dashboard)
        .service(signup_form)
        .service(signup)
        .service(login_form)
        .service(login)
        .service(logout)
        .service(groups)
        .service(create_group_form)
        .service(create_group)
        .service(view_group)
        .service(add_expense_form)
        .service(add_expense);
}

/// Trimmed value of an optional form field; missing and blank are both `None`.
fn field(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_group_id(raw: &str) -> Result<GroupId, AppError> {
    ObjectId::parse_str(raw).map_err(|_| AppError::NotFound)
}

async fn load_group(store: &dyn Store, raw_id: &str) -> Result<Group, AppError> {
    let id = parse_group_id(raw_id)?;
    store.find_group(id).await?.ok_or(AppError::NotFound)
}

fn user_context(user: &User) -> Context {
    let mut context = Context::new();
    context.insert("user", &UserView::from(user));
    context
}

#[get("/")]
async fn dashboard(req: HttpRequest, views: web::Data<Views>, current: CurrentUser) -> Response {
    views.render(&req, "dashboard.html", user_context(&current.0))
}

#[derive(Deserialize)]
struct SignupForm {
    username: Option<String>,
    email: Option<String>,
    password: Option<String>,
}

#[get("/signup")]
async fn signup_form(req: HttpRequest, views: web::Data<Views>) -> Response {
    views.render(&req, "signup.html", Context::new())
}

#[post("/signup")]
async fn signup(store: web::Data<dyn Store>, form: web::Form<SignupForm>) -> Response {
    let form = form.into_inner();
    let password = form.password.as_deref().filter(|p| !p.is_empty());
    let (Some(username), Some(email), Some(password)) =
        (field(&form.username), field(&form.email), password)
    else {
        return Ok(flash::redirect("/signup", FlashMessage::error("Please enter all fields")));
    };

    if store.find_user_by_email(email).await?.is_some() {
        return Ok(flash::redirect("/signup", FlashMessage::error("Email already exists")));
    }

    let user = User::new(
        username.to_string(),
        email.to_string(),
        hash_password(password)?,
    );
    match store.insert_user(&user).await {
        Ok(()) => {}
        Err(StoreError::Duplicate(UniqueField::Email)) => {
            return Ok(flash::redirect("/signup", FlashMessage::error("Email already exists")));
        }
        Err(StoreError::Duplicate(UniqueField::Username)) => {
            return Ok(flash::redirect("/signup", FlashMessage::error("Username already taken")));
        }
        Err(err) => return Err(err.into()),
    }

    tracing::info!(user_id = %user.id, username = %user.username, "account created");
    Ok(flash::redirect(
        "/login",
        FlashMessage::success("Account created! Please Login."),
    ))
}

#[derive(Deserialize)]
struct LoginForm {
    email: Option<String>,
    password: Option<String>,
}

#[get("/login")]
async fn login_form(req: HttpRequest, views: web::Data<Views>) -> Response {
    views.render(&req, "login.html", Context::new())
}

#[post("/login")]
async fn login(
    store: web::Data<dyn Store>,
    signer: web::Data<SessionSigner>,
    form: web::Form<LoginForm>,
) -> Response {
    let email = field(&form.email).unwrap_or_default();
    let password = form.password.as_deref().unwrap_or_default();

    let user = match store.find_user_by_email(email).await? {
        Some(user) if verify_password(password, &user.password_hash) => user,
        _ => {
            tracing::warn!(email, "failed login attempt");
            return Ok(flash::redirect("/login", FlashMessage::error("Invalid credentials")));
        }
    };

    tracing::info!(user_id = %user.id, "logged in");
    Ok(HttpResponse::SeeOther()
        .insert_header((header::LOCATION, "/groups"))
        .cookie(signer.session_cookie(user.id))
        .finish())
}

#[get("/logout")]
async fn logout(signer: web::Data<SessionSigner>, current: CurrentUser) -> Response {
    tracing::info!(user_id = %current.0.id, "logged out");
    Ok(HttpResponse::SeeOther()
        .insert_header((header::LOCATION, "/login"))
        .cookie(signer.removal_cookie())
        .finish())
}

#[get("/groups")]
async fn groups(
    req: HttpRequest,
    store: web::Data<dyn Store>,
    views: web::Data<Views>,
    current: CurrentUser,
) -> Response {
    let groups: Vec<GroupView> = store
        .groups_for_user(current.0.id)
        .await?
        .iter()
        .map(GroupView::from)
        .collect();
    let mut context = user_context(&current.0);
    context.insert("groups", &groups);
    views.render(&req, "groups.html", context)
}

#[derive(Deserialize)]
struct CreateGroupForm {
    name: Option<String>,
}

#[get("/create_group")]
async fn create_group_form(
    req: HttpRequest,
    views: web::Data<Views>,
    current: CurrentUser,
) -> Response {
    views.render(&req, "create_group.html", user_context(&current.0))
}

#[post("/create_group")]
async fn create_group(
    store: web::Data<dyn Store>,
    current: CurrentUser,
    form: web::Form<CreateGroupForm>,
) -> Response {
    let Some(name) = field(&form.name) else {
        return Ok(flash::redirect("/create_group", FlashMessage::error("Group name required")));
    };

    let group = Group::new(name.to_string(), current.0.id);
    store.insert_group(&group).await?;
    store
        .insert_membership(&Membership::new(group.id, current.0.id))
        .await?;

    tracing::info!(group_id = %group.id, user_id = %current.0.id, "group created");
    Ok(flash::redirect(
        "/groups",
        FlashMessage::success("Group created successfully"),
    ))
}

#[get("/group/{id}")]
async fn view_group(
    req: HttpRequest,
    store: web::Data<dyn Store>,
    views: web::Data<Views>,
    current: CurrentUser,
    id: web::Path<String>,
) -> Response {
    let group = load_group(store.get_ref(), &id).await?;
    let expenses = store.expenses_of(group.id).await?;
    let members = store.members_of(group.id).await?;

    let member_ids: Vec<UserId> = members.iter().map(|m| m.user_id).collect();
    let balance = compute_group_balance(&member_ids, &expenses);

    let mut user_ids = member_ids;
    user_ids.extend(expenses.iter().map(|e| e.paid_by));
    user_ids.sort();
    user_ids.dedup();
    let users: HashMap<UserId, User> = store
        .find_users(&user_ids)
        .await?
        .into_iter()
        .map(|user| (user.id, user))
        .collect();

    let mut context = user_context(&current.0);
    context.insert("group", &GroupView::from(&group));
    context.insert("expenses", &expense_views(&expenses, &users));
    context.insert("balances", &balance_views(&balance, &members, &users));
    views.render(&req, "view_group.html", context)
}

#[derive(Deserialize)]
struct ExpenseForm {
    description: Option<String>,
    amount: Option<String>,
}

#[get("/group/{id}/add_expense")]
async fn add_expense_form(
    req: HttpRequest,
    store: web::Data<dyn Store>,
    views: web::Data<Views>,
    current: CurrentUser,
    id: web::Path<String>,
) -> Response {
    let group = load_group(store.get_ref(), &id).await?;
    let mut context = user_context(&current.0);
    context.insert("group", &GroupView::from(&group));
    views.render(&req, "add_expense.html", context)
}

/// Strictly positive and no larger than [`MAX_AMOUNT`].
fn parse_amount(raw: &str) -> Option<f64> {
    raw.parse::<f64>()
        .ok()
        .filter(|amount| *amount > 0.0 && *amount <= MAX_AMOUNT)
}

#[post("/group/{id}/add_expense")]
async fn add_expense(
    store: web::Data<dyn Store>,
    current: CurrentUser,
    id: web::Path<String>,
    form: web::Form<ExpenseForm>,
) -> Response {
    let group = load_group(store.get_ref(), &id).await?;
    let back = format!("/group/{}/add_expense", group.id.to_hex());

    let (Some(description), Some(amount)) = (field(&form.description), field(&form.amount))
    else {
        return Ok(flash::redirect(&back, FlashMessage::error("Please enter all fields")));
    };
    let Some(amount) = parse_amount(amount) else {
        return Ok(flash::redirect(&back, FlashMessage::error("Please enter a valid amount")));
    };

    let expense = Expense::new(group.id, current.0.id, description.to_string(), amount);
    store.insert_expense(&expense).await?;

    tracing::info!(
        group_id = %group.id,
        paid_by = %current.0.id,
        amount,
        "expense added"
    );
    Ok(flash::redirect(
        &format!("/group/{}", group.id.to_hex()),
        FlashMessage::success("Expense added!"),
    ))
}
