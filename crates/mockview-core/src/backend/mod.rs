pub mod client;
pub mod models;

pub use client::BackendClient;
pub use models::{
    Interview, InterviewAnswer, InterviewQuestion, InterviewStatus, NewAnswer, NewInterview,
    Notification, Profile,
};
