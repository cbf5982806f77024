//! Data models for Roomies entities.
//!
//! This module contains the data structures exchanged with the backend:
//!
//! - `Room`: room membership and invite codes
//! - `Chore`, `NewChore`, `ChoreUpdate`: chore assignment and completion
//! - `Roommate`, `RoommateWithPicture`, `ProfilePicture`: people in the room
//! - Expense types: `ExpensePeriod`, `Expense`, `NewExpense`, `ExpenseShare`
//! - Notification types: `Notification`, `NewNotification`, `NotificationUpdate`
//! - `User`, `UserUpdate`: profile management

pub mod chore;
pub mod expense;
pub mod notification;
pub mod room;
pub mod roommate;
pub mod user;

pub use chore::{Chore, ChoreUpdate, NewChore};
pub use expense::{balances, Expense, ExpensePeriod, ExpenseShare, NewExpense};
pub use notification::{unread_count, NewNotification, Notification, NotificationUpdate};
pub use room::{ActionResult, Room};
pub use roommate::{ProfilePicture, Roommate, RoommateWithPicture};
pub use user::{User, UserUpdate};
