//! Integration tests driving the kaeter binary against temporary git repositories

mod helpers;
mod test_ci;
mod test_init;
mod test_inventory;
mod test_prepare;
mod test_release;
