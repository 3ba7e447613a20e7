use std::collections::HashMap;

use actix_web::http::header::ContentType;
use actix_web::{HttpRequest, HttpResponse};
use serde::Serialize;
use tera::{Context, Tera};

use crate::balance::Balance;
use crate::error::AppError;
use crate::flash;
use crate::schemas::{Expense, Group, Membership, User, UserId};

const TEMPLATES: [(&str, &str); 8] = [
    ("base.html", include_str!("../templates/base.html")),
    ("dashboard.html", include_str!("../templates/dashboard.html")),
    ("signup.html", include_str!("../templates/signup.html")),
    ("login.html", include_str!("../templates/login.html")),
    ("groups.html", include_str!("../templates/groups.html")),
    ("create_group.html", include_str!("../templates/create_group.html")),
    ("view_group.html", include_str!("../templates/view_group.html")),
    ("add_expense.html", include_str!("../templates/add_expense.html")),
];

/// Page rendering. Templates are compiled into the binary.
pub struct Views {
    tera: Tera,
}

impl Views {
    pub fn new() -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES)?;
        Ok(Self { tera })
    }

    /// Renders `template` as a 200 HTML page, showing and clearing any
    /// pending flash messages.
    pub fn render(
        &self,
        req: &HttpRequest,
        template: &str,
        mut context: Context,
    ) -> Result<HttpResponse, AppError> {
        let messages = flash::take(req);
        context.insert("messages", &messages);
        let body = self.tera.render(template, &context)?;

        let mut response = HttpResponse::Ok();
        response.content_type(ContentType::html());
        if req.cookie(flash::COOKIE_NAME).is_some() {
            response.cookie(flash::removal_cookie());
        }
        Ok(response.body(body))
    }
}

#[derive(Debug, Serialize)]
pub struct UserView {
    pub username: String,
    pub email: String,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GroupView {
    pub id: String,
    pub name: String,
}

impl From<&Group> for GroupView {
    fn from(group: &Group) -> Self {
        Self {
            id: group.id.to_hex(),
            name: group.name.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExpenseView {
    pub description: String,
    pub amount: String,
    pub payer: String,
    pub created_at: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct BalanceView {
    pub username: String,
    pub amount: String,
    pub member: bool,
}

const UNKNOWN_USER: &str = "unknown user";

fn username(users: &HashMap<UserId, User>, id: &UserId) -> String {
    users
        .get(id)
        .map(|user| user.username.clone())
        .unwrap_or_else(|| UNKNOWN_USER.to_string())
}

pub fn expense_views(expenses: &[Expense], users: &HashMap<UserId, User>) -> Vec<ExpenseView> {
    expenses
        .iter()
        .map(|expense| ExpenseView {
            description: expense.description.clone(),
            amount: format!("{:.2}", expense.amount),
            payer: username(users, &expense.paid_by),
            created_at: expense.created_at.format("%Y-%m-%d %H:%M").to_string(),
        })
        .collect()
}

/// Members in enrollment order, followed by payers who are not members.
pub fn balance_views(
    balance: &Balance,
    members: &[Membership],
    users: &HashMap<UserId, User>,
) -> Vec<BalanceView> {
    let mut rows = Vec::with_capacity(balance.len());
    let mut seen = Vec::with_capacity(balance.len());
    for membership in members {
        let id = membership.user_id;
        if seen.contains(&id) {
            continue;
        }
        if let Some(amount) = balance.get(&id) {
            seen.push(id);
            rows.push(BalanceView {
                username: username(users, &id),
                amount: format!("{amount:.2}"),
                member: true,
            });
        }
    }

    let mut orphans: Vec<BalanceView> = balance
        .iter()
        .filter(|(id, _)| !seen.contains(*id))
        .map(|(id, amount)| BalanceView {
            username: username(users, id),
            amount: format!("{amount:.2}"),
            member: false,
        })
        .collect();
    orphans.sort_by(|a, b| a.username.cmp(&b.username));
    rows.extend(orphans);
    rows
}
