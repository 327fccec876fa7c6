mod concurrency_test;
mod helpers;
mod profile_test;
mod redeem_test;
mod reset_test;
