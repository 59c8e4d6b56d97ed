use std::{thread::sleep, time::Duration};

use measures::ReporterBuilder;
use metrics::{counter, histogram};

fn main() {
    tracing_subscriber::fmt::init();

    ReporterBuilder::default()
        .with_client_name("bookstore")
        .with_remote_address("localhost:3593")
        .expect("failed to parse remote address")
        .with_write_timeout(Duration::from_millis(100))
        .install()
        .expect("failed to install measures recorder");

    let orders = counter!("orders", "shelf" => "fiction");
    let checkout_secs = histogram!("checkout", "shelf" => "fiction");

    for i in 0u32.. {
        orders.increment(1);
        checkout_secs.record(f64::from(i % 10) / 100.0);
        sleep(Duration::from_millis(250));
    }
}
