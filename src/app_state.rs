use rand::rngs::StdRng;
use std::sync::Arc;

use crate::{
    accounts::{db_repository::DatabaseAccountRepository, AccountService},
    auth::{db_repository::DatabaseAuthRepository, AuthService},
};

pub type Accounts = AccountService<DatabaseAccountRepository>;
pub type Auth = AuthService<DatabaseAuthRepository, StdRng>;

#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<Accounts>,
    pub auth: Arc<Auth>,
}
