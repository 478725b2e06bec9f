mod helpers;
mod payments;
mod subscribers;
