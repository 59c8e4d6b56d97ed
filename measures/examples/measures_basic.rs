use std::{thread::sleep, time::Duration, time::Instant};

use measures::{dimensions, Reporter};

fn main() {
    tracing_subscriber::fmt::init();

    let mut reporter = Reporter::new("bookstore", "localhost:3593");

    let book = dimensions! {
        "title" => "Blood Meridian",
        "author" => dimensions! { "first" => "Cormac", "last" => "McCarthy" },
        "pages" => 337,
    };

    // Loop over and over, pretending to sell some books.
    loop {
        let start = Instant::now();
        sleep(Duration::from_millis(250));

        if let Err(e) = reporter.count("books_sold", 1, &book) {
            tracing::warn!(error = %e, "Failed to report count.");
        }
        if let Err(e) = reporter.time("checkout", start, &book) {
            tracing::warn!(error = %e, "Failed to report time.");
        }
    }
}
