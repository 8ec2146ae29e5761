//! In-memory LibraryHub server for tests.
//!
//! Implements the REST surface the client consumes behind the [`Transport`]
//! seam: bearer-token auth, role checks, book stock bookkeeping, loans and
//! user administration. Every request is recorded for assertions, and any
//! `(method, path)` can be forced to a canned response.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use reqwest::Method;
use serde_json::{Value, json};

use crate::models::{Book, BorrowStatus, Role, User};
use crate::net::error::ApiError;
use crate::net::transport::{FormField, HttpRequest, HttpResponse, RequestBody, Transport};
use crate::session::{MemoryTokenStorage, SessionStore};
use crate::shell::App;

pub const BASE_URL: &str = "http://library.test/api";

struct Account {
    user: User,
    password: String,
}

struct Loan {
    id: u64,
    book_id: String,
    user_id: String,
    borrow_date: String,
    due_date: String,
    status: BorrowStatus,
}

struct Override {
    method: Method,
    path: String,
    status: u16,
    body: Value,
}

#[derive(Default)]
struct FakeState {
    accounts: Vec<Account>,
    tokens: HashMap<String, String>,
    books: Vec<Book>,
    loans: Vec<Loan>,
    overrides: Vec<Override>,
    requests: Vec<HttpRequest>,
    next_id: u64,
    offline: bool,
}

impl FakeState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct FakeLibrary {
    state: Mutex<FakeState>,
}

impl FakeLibrary {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_user(&self, name: &str, email: &str, password: &str, role: Role) -> User {
        let mut state = self.state();
        let id = state.next_id().to_string();
        let user = User {
            id,
            name: name.to_owned(),
            email: email.to_owned(),
            role,
            is_active: true,
            profile_image: None,
        };
        state.accounts.push(Account { user: user.clone(), password: password.to_owned() });
        user
    }

    pub fn issue_token(&self, user_id: &str) -> String {
        let token = format!("token-{user_id}");
        self.state().tokens.insert(token.clone(), user_id.to_owned());
        token
    }

    pub fn add_book(&self, title: &str, total: u32, available: u32) -> Book {
        self.add_book_in(title, None, total, available)
    }

    pub fn add_book_in(&self, title: &str, category: Option<&str>, total: u32, available: u32) -> Book {
        let mut state = self.state();
        let id = state.next_id();
        let book = Book {
            id: id.to_string(),
            title: title.to_owned(),
            author: format!("Author of {title}"),
            isbn: format!("978-{id:010}"),
            category: category.map(ToOwned::to_owned),
            description: None,
            published_year: Some(2001),
            total_copies: total,
            available_copies: available,
            cover_image: None,
        };
        state.books.push(book.clone());
        book
    }

    pub fn book(&self, id: &str) -> Option<Book> {
        self.state().books.iter().find(|b| b.id == id).cloned()
    }

    pub fn password_of(&self, id: &str) -> Option<String> {
        self.state().accounts.iter().find(|a| a.user.id == id).map(|a| a.password.clone())
    }

    /// Force every `(method, path)` request to return `status` + `body`.
    pub fn respond_with(&self, method: Method, path: &str, status: u16, body: Value) {
        self.state().overrides.push(Override { method, path: path.to_owned(), status, body });
    }

    pub fn set_offline(&self, offline: bool) {
        self.state().offline = offline;
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state().requests.clone()
    }

    pub fn count(&self, method: &Method, path: &str) -> usize {
        self.state()
            .requests
            .iter()
            .filter(|r| &r.method == method && r.path == path)
            .count()
    }

    fn handle(&self, request: &HttpRequest) -> HttpResponse {
        let mut state = self.state();
        if let Some(hit) = state
            .overrides
            .iter()
            .find(|o| o.method == request.method && o.path == request.path)
        {
            return reply(hit.status, hit.body.clone());
        }

        let caller = request
            .header("authorization")
            .and_then(|h| h.strip_prefix("Bearer "))
            .and_then(|token| state.tokens.get(token).cloned())
            .and_then(|id| state.accounts.iter().find(|a| a.user.id == id).map(|a| a.user.clone()));

        let segments: Vec<&str> = request.path.split('/').filter(|s| !s.is_empty()).collect();
        match (request.method.as_str(), segments.as_slice()) {
            ("POST", ["auth", "login"]) => login(&mut state, request),
            ("POST", ["auth", "register"]) => register(&mut state, request),
            ("GET", ["auth", "me"]) => with_user(caller, |user| reply(200, json!({ "data": user }))),
            ("GET", ["books"]) => list_books(&state, request),
            ("POST", ["books"]) => with_staff(caller, |_| create_book(&mut state, request)),
            ("PUT", ["books", id]) => with_staff(caller, |_| update_book(&mut state, id, request)),
            ("DELETE", ["books", id]) => with_staff(caller, |_| {
                let before = state.books.len();
                state.books.retain(|b| b.id != *id);
                if state.books.len() == before {
                    not_found("Book not found")
                } else {
                    reply(200, json!({ "message": "Book deleted" }))
                }
            }),
            ("POST", ["borrow"]) => with_user(caller, |user| borrow(&mut state, &user, request)),
            ("POST", ["borrow", "return"]) => with_user(caller, |user| return_loan(&mut state, &user, request)),
            ("GET", ["borrow", "history", "my"]) => with_user(caller, |user| history(&state, &user, request)),
            ("GET", ["users", "statistics", "all"]) => with_admin(caller, |_| statistics(&state)),
            ("GET", ["users"]) => with_admin(caller, |_| list_users(&state, request)),
            ("GET", ["users", id]) => with_user(caller, |user| {
                if user.id != *id && user.role != Role::Admin {
                    return forbidden();
                }
                find_account(&mut state, id).map_or_else(
                    || not_found("User not found"),
                    |account| reply(200, json!({ "data": account.user })),
                )
            }),
            ("PUT", ["users", id]) => with_user(caller, |user| update_user(&mut state, &user, id, request)),
            ("PATCH", ["users", id, "status"]) => with_admin(caller, |_| {
                find_account(&mut state, id).map_or_else(
                    || not_found("User not found"),
                    |account| {
                        account.user.is_active = !account.user.is_active;
                        reply(200, json!({ "data": account.user }))
                    },
                )
            }),
            ("PUT", ["users", id, "role"]) => with_admin(caller, |_| {
                let Some(role) = json_str(request, "role").and_then(|r| r.parse::<Role>().ok()) else {
                    return reply(400, json!({ "message": "Invalid role" }));
                };
                find_account(&mut state, id).map_or_else(
                    || not_found("User not found"),
                    |account| {
                        account.user.role = role;
                        reply(200, json!({ "data": account.user }))
                    },
                )
            }),
            ("DELETE", ["users", id]) => with_admin(caller, |_| {
                let before = state.accounts.len();
                state.accounts.retain(|a| a.user.id != *id);
                if state.accounts.len() == before {
                    not_found("User not found")
                } else {
                    reply(200, json!({ "message": "User deleted" }))
                }
            }),
            ("POST", ["users", id, "change-password"]) => with_user(caller, |user| {
                if user.id != *id {
                    return forbidden();
                }
                let current = json_str(request, "currentPassword").unwrap_or_default();
                let new = json_str(request, "newPassword").unwrap_or_default();
                match find_account(&mut state, id) {
                    Some(account) if account.password == current => {
                        account.password = new;
                        reply(200, json!({ "message": "Password changed" }))
                    }
                    Some(_) => reply(400, json!({ "message": "Current password is incorrect" })),
                    None => not_found("User not found"),
                }
            }),
            _ => not_found("Route not found"),
        }
    }
}

#[async_trait::async_trait]
impl Transport for FakeLibrary {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        // Yield once so concurrent callers interleave like real network I/O.
        tokio::task::yield_now().await;
        {
            let mut state = self.state();
            state.requests.push(request.clone());
            if state.offline {
                return Err(ApiError::Network("connection refused".to_owned()));
            }
        }
        Ok(self.handle(&request))
    }
}

/// Shell wired to `fake`, optionally starting with a persisted token.
pub fn app_with(fake: &Arc<FakeLibrary>, token: Option<&str>) -> App {
    let storage = token.map_or_else(MemoryTokenStorage::default, MemoryTokenStorage::with_token);
    let session = Arc::new(SessionStore::open(Box::new(storage)));
    App::with_transport(Arc::clone(fake) as Arc<dyn Transport>, BASE_URL, session)
}

/// Shell wired to `fake` with `user` already signed in.
pub fn signed_in_app(fake: &Arc<FakeLibrary>, user: &User) -> App {
    let token = fake.issue_token(&user.id);
    let app = app_with(fake, Some(&token));
    app.session().set_user(Some(user.clone()));
    app
}

fn reply(status: u16, body: Value) -> HttpResponse {
    HttpResponse { status, body }
}

fn not_found(message: &str) -> HttpResponse {
    reply(404, json!({ "message": message }))
}

fn forbidden() -> HttpResponse {
    reply(403, json!({ "message": "Access denied" }))
}

fn with_user(caller: Option<User>, f: impl FnOnce(User) -> HttpResponse) -> HttpResponse {
    match caller {
        Some(user) => f(user),
        None => reply(401, json!({ "message": "Not authorized, no token" })),
    }
}

fn with_staff(caller: Option<User>, f: impl FnOnce(User) -> HttpResponse) -> HttpResponse {
    with_user(caller, |user| match user.role {
        Role::Admin | Role::Librarian => f(user),
        Role::Member => forbidden(),
    })
}

fn with_admin(caller: Option<User>, f: impl FnOnce(User) -> HttpResponse) -> HttpResponse {
    with_user(caller, |user| match user.role {
        Role::Admin => f(user),
        _ => forbidden(),
    })
}

fn find_account<'a>(state: &'a mut FakeState, id: &str) -> Option<&'a mut Account> {
    state.accounts.iter_mut().find(|a| a.user.id == id)
}

fn json_value<'a>(request: &'a HttpRequest, key: &str) -> Option<&'a Value> {
    match &request.body {
        RequestBody::Json(body) => body.get(key),
        _ => None,
    }
}

fn json_str(request: &HttpRequest, key: &str) -> Option<String> {
    json_value(request, key).and_then(Value::as_str).map(ToOwned::to_owned)
}

fn json_id(request: &HttpRequest, key: &str) -> Option<String> {
    match json_value(request, key)? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

fn form_fields(request: &HttpRequest) -> HashMap<String, String> {
    let RequestBody::Multipart(fields) = &request.body else {
        return HashMap::new();
    };
    fields
        .iter()
        .map(|field| match field {
            FormField::Text { name, value } => (name.clone(), value.clone()),
            FormField::File { name, path } => (
                name.clone(),
                path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default(),
            ),
        })
        .collect()
}

fn auth_payload(state: &mut FakeState, user: &User, status: u16) -> HttpResponse {
    let token = format!("token-{}", user.id);
    state.tokens.insert(token.clone(), user.id.clone());
    reply(status, json!({ "token": token, "data": user }))
}

fn login(state: &mut FakeState, request: &HttpRequest) -> HttpResponse {
    let email = json_str(request, "email").unwrap_or_default();
    let password = json_str(request, "password").unwrap_or_default();
    let Some(account) = state.accounts.iter().find(|a| a.user.email == email) else {
        return not_found("User not found");
    };
    if account.password != password {
        return reply(401, json!({ "message": "Invalid email or password" }));
    }
    let user = account.user.clone();
    auth_payload(state, &user, 200)
}

fn register(state: &mut FakeState, request: &HttpRequest) -> HttpResponse {
    let email = json_str(request, "email").unwrap_or_default();
    if state.accounts.iter().any(|a| a.user.email == email) {
        return reply(400, json!({ "message": "Email already registered" }));
    }
    let user = User {
        id: state.next_id().to_string(),
        name: json_str(request, "name").unwrap_or_default(),
        email,
        role: Role::Member,
        is_active: true,
        profile_image: None,
    };
    let password = json_str(request, "password").unwrap_or_default();
    state.accounts.push(Account { user: user.clone(), password });
    auth_payload(state, &user, 201)
}

fn page_params(request: &HttpRequest, default_limit: usize) -> (usize, usize) {
    let page = request
        .query_value("page")
        .and_then(|p| p.parse::<usize>().ok())
        .unwrap_or(1)
        .max(1);
    let limit = request
        .query_value("limit")
        .and_then(|l| l.parse::<usize>().ok())
        .unwrap_or(default_limit)
        .max(1);
    (page, limit)
}

fn paginate<T: serde::Serialize>(items: &[T], page: usize, limit: usize) -> HttpResponse {
    let total = items.len();
    let pages = total.div_ceil(limit);
    let data: Vec<&T> = items.iter().skip((page - 1) * limit).take(limit).collect();
    reply(
        200,
        json!({
            "data": data,
            "pagination": { "total": total, "page": page, "limit": limit, "pages": pages }
        }),
    )
}

fn list_books(state: &FakeState, request: &HttpRequest) -> HttpResponse {
    let search = request.query_value("search").map(str::to_lowercase);
    let category = request.query_value("category");
    let matches: Vec<&Book> = state
        .books
        .iter()
        .filter(|b| {
            search.as_deref().is_none_or(|s| {
                b.title.to_lowercase().contains(s) || b.author.to_lowercase().contains(s) || b.isbn.contains(s)
            })
        })
        .filter(|b| category.is_none_or(|c| b.category.as_deref() == Some(c)))
        .collect();
    let (page, limit) = page_params(request, 10);
    paginate(&matches, page, limit)
}

fn apply_book_fields(book: &mut Book, fields: &HashMap<String, String>) {
    if let Some(v) = fields.get("title") {
        book.title.clone_from(v);
    }
    if let Some(v) = fields.get("author") {
        book.author.clone_from(v);
    }
    if let Some(v) = fields.get("isbn") {
        book.isbn.clone_from(v);
    }
    if let Some(v) = fields.get("description") {
        book.description = Some(v.clone()).filter(|d| !d.is_empty());
    }
    if let Some(v) = fields.get("category") {
        book.category = Some(v.clone()).filter(|c| !c.is_empty());
    }
    if let Some(v) = fields.get("publishedYear") {
        book.published_year = v.parse().ok();
    }
    if let Some(v) = fields.get("totalCopies").and_then(|v| v.parse().ok()) {
        book.total_copies = v;
    }
    if let Some(v) = fields.get("availableCopies").and_then(|v| v.parse().ok()) {
        book.available_copies = v;
    }
    if let Some(v) = fields.get("coverImage") {
        book.cover_image = Some(format!("/uploads/covers/{v}"));
    }
}

fn create_book(state: &mut FakeState, request: &HttpRequest) -> HttpResponse {
    let fields = form_fields(request);
    let isbn = fields.get("isbn").cloned().unwrap_or_default();
    if state.books.iter().any(|b| b.isbn == isbn) {
        return reply(400, json!({ "message": "ISBN already exists" }));
    }
    let mut book = Book {
        id: state.next_id().to_string(),
        title: String::new(),
        author: String::new(),
        isbn,
        category: None,
        description: None,
        published_year: None,
        total_copies: 0,
        available_copies: 0,
        cover_image: None,
    };
    apply_book_fields(&mut book, &fields);
    state.books.push(book.clone());
    reply(201, json!({ "data": book }))
}

fn update_book(state: &mut FakeState, id: &str, request: &HttpRequest) -> HttpResponse {
    let fields = form_fields(request);
    let Some(book) = state.books.iter_mut().find(|b| b.id == id) else {
        return not_found("Book not found");
    };
    apply_book_fields(book, &fields);
    reply(200, json!({ "data": book }))
}

fn loan_json(state: &FakeState, loan: &Loan) -> Value {
    let book = state.books.iter().find(|b| b.id == loan.book_id);
    json!({
        "id": loan.id,
        "bookId": loan.book_id.parse::<u64>().map_or_else(|_| json!(loan.book_id), |id| json!(id)),
        "userId": loan.user_id,
        "borrowDate": loan.borrow_date,
        "dueDate": loan.due_date,
        "status": loan.status,
        "Book": book,
    })
}

fn borrow(state: &mut FakeState, user: &User, request: &HttpRequest) -> HttpResponse {
    let Some(book_id) = json_id(request, "bookId") else {
        return reply(400, json!({ "message": "bookId is required" }));
    };
    let Some(due_date) = json_str(request, "dueDate") else {
        return reply(400, json!({ "message": "dueDate is required" }));
    };
    let Some(book) = state.books.iter_mut().find(|b| b.id == book_id) else {
        return not_found("Book not found");
    };
    if book.available_copies == 0 {
        return reply(400, json!({ "message": "No copies available" }));
    }
    book.available_copies -= 1;
    let id = state.next_id();
    let loan = Loan {
        id,
        book_id,
        user_id: user.id.clone(),
        borrow_date: "2024-06-01T09:30:00.000Z".to_owned(),
        due_date,
        status: BorrowStatus::Borrowed,
    };
    let body = loan_json(state, &loan);
    state.loans.push(loan);
    reply(201, json!({ "data": body }))
}

fn return_loan(state: &mut FakeState, user: &User, request: &HttpRequest) -> HttpResponse {
    let Some(record_id) = json_id(request, "borrowRecordId") else {
        return reply(400, json!({ "message": "borrowRecordId is required" }));
    };
    let Some(loan) = state
        .loans
        .iter_mut()
        .find(|l| l.id.to_string() == record_id && l.user_id == user.id)
    else {
        return not_found("Borrow record not found");
    };
    if loan.status == BorrowStatus::Returned {
        return reply(400, json!({ "message": "Book already returned" }));
    }
    loan.status = BorrowStatus::Returned;
    let book_id = loan.book_id.clone();
    if let Some(book) = state.books.iter_mut().find(|b| b.id == book_id) {
        book.available_copies = (book.available_copies + 1).min(book.total_copies);
    }
    reply(200, json!({ "message": "Book returned" }))
}

fn history(state: &FakeState, user: &User, request: &HttpRequest) -> HttpResponse {
    let status = request.query_value("status");
    let data: Vec<Value> = state
        .loans
        .iter()
        .filter(|l| l.user_id == user.id)
        .filter(|l| status.is_none_or(|s| l.status.as_str() == s))
        .map(|l| loan_json(state, l))
        .collect();
    reply(200, json!({ "data": data }))
}

fn list_users(state: &FakeState, request: &HttpRequest) -> HttpResponse {
    let search = request.query_value("search").map(str::to_lowercase);
    let users: Vec<&User> = state
        .accounts
        .iter()
        .map(|a| &a.user)
        .filter(|u| {
            search
                .as_deref()
                .is_none_or(|s| u.name.to_lowercase().contains(s) || u.email.to_lowercase().contains(s))
        })
        .collect();
    let (page, limit) = page_params(request, 10);
    paginate(&users, page, limit)
}

fn statistics(state: &FakeState) -> HttpResponse {
    let count_role = |role: Role| state.accounts.iter().filter(|a| a.user.role == role).count();
    let active = state.accounts.iter().filter(|a| a.user.is_active).count();
    reply(
        200,
        json!({
            "data": {
                "totalUsers": state.accounts.len(),
                "activeUsers": active,
                "inactiveUsers": state.accounts.len() - active,
                "usersByRole": {
                    "admin": count_role(Role::Admin),
                    "librarian": count_role(Role::Librarian),
                    "member": count_role(Role::Member),
                }
            }
        }),
    )
}

fn update_user(state: &mut FakeState, caller: &User, id: &str, request: &HttpRequest) -> HttpResponse {
    if caller.id != id && caller.role != Role::Admin {
        return forbidden();
    }
    let fields = form_fields(request);
    let Some(account) = find_account(state, id) else {
        return not_found("User not found");
    };
    if let Some(name) = fields.get("name") {
        account.user.name.clone_from(name);
    }
    if let Some(email) = fields.get("email") {
        account.user.email.clone_from(email);
    }
    if let Some(file) = fields.get("profileImage") {
        account.user.profile_image = Some(format!("/uploads/profiles/{file}"));
    }
    reply(200, json!({ "data": account.user }))
}
