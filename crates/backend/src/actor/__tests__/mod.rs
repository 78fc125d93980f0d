mod helpers;
mod pipeline;
mod watchdog;
