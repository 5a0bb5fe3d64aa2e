pub mod audit;
pub mod config;
pub mod context;
pub mod engine;
pub mod history;
pub mod key;
pub mod ledger;
pub mod lock;
pub mod paths;
pub mod recent;
pub mod render;
pub mod scanner;
pub mod state;
pub mod util;
pub mod variables;
pub mod verifier;
