//! Interactive menu shown when the CLI is started without a subcommand.
//!
//! Mirrors the subcommand surface for the read-only operations: browsing
//! the largest events and requesting a forecast. Pipeline stages that
//! mutate files (`fetch`, `resolve`, `train`, `serve`) stay
//! subcommand-only so they are never triggered by an accidental keypress.

use dialoguer::{Input, Select};
use quakecast_config::QuakecastConfig;

/// Top-level menu items.
enum MenuItem {
    LargestFive,
    SearchByProvince,
    Forecast,
    Exit,
}

impl MenuItem {
    const ALL: &[Self] = &[
        Self::LargestFive,
        Self::SearchByProvince,
        Self::Forecast,
        Self::Exit,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::LargestFive => "Show the five largest earthquakes",
            Self::SearchByProvince => "Search earthquakes by province",
            Self::Forecast => "Forecast the next earthquake",
            Self::Exit => "Exit",
        }
    }
}

/// Runs the menu loop until the user exits.
///
/// Failures of individual actions (unknown province, missing model bundle)
/// are printed and the menu continues; only prompt errors abort.
///
/// # Errors
///
/// Returns an error if a terminal prompt fails.
pub fn run(config: &QuakecastConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("Quakecast");
    println!();

    let labels: Vec<&str> = MenuItem::ALL.iter().map(MenuItem::label).collect();

    loop {
        let idx = Select::new()
            .with_prompt("What would you like to do?")
            .items(&labels)
            .default(0)
            .interact()?;

        match MenuItem::ALL[idx] {
            MenuItem::LargestFive => {
                if let Err(e) = crate::top(config, None, 5) {
                    println!("{e}");
                }
            }
            MenuItem::SearchByProvince => {
                let location: String = Input::new().with_prompt("Province").interact_text()?;
                if let Err(e) = crate::top(config, Some(&location), 5) {
                    println!("{e}");
                }
            }
            MenuItem::Forecast => {
                let location: String = Input::new().with_prompt("Province").interact_text()?;
                if let Err(e) = crate::predict(config, &location) {
                    println!("{e}");
                }
            }
            MenuItem::Exit => return Ok(()),
        }
        println!();
    }
}
