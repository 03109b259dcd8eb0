//! `queryset`: list the objects of a fixture model that match a
//! Django style filter expression.
//!
//! **Usage:**
//! ```text
//! queryset people.json people.Person --filter "user__username__icontains=bob" --order-by -birthday
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::FixedOffset;
use clap::Parser;
use log::debug;
use queryset_cmd::datetime::parse_timezone;
use queryset_cmd::expression::{parse, Clauses};
use queryset_cmd::filtering::{QuerySetFilter, Resolver};
use queryset_cmd::fixture::load_path;
use queryset_cmd::queryset::QuerySet;
use queryset_cmd::row::{display, to_dict, to_json};

const DEFAULT_LIMIT: usize = 20;

/// Filter the objects of a model.
#[derive(Parser)]
#[command(name = "queryset", version, about = "Filter fixture objects with Django style lookups")]
struct Args {
    /// JSON fixture holding the models and their objects.
    fixture: PathBuf,

    /// Model label, e.g. people.Person.
    model: String,

    /// Filter expression, e.g. "name__icontains=rob,age__gte=18".
    #[arg(long, value_parser = parse)]
    filter: Vec<Clauses>,

    /// Exclude expression, in the same form as --filter.
    #[arg(long, value_parser = parse)]
    exclude: Vec<Clauses>,

    /// Comma separated fields, prefixed with '-' for descending order.
    #[arg(long, allow_hyphen_values = true)]
    order_by: Option<String>,

    /// Maximum number of objects to list.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    limit: Option<u64>,

    /// Fail on clauses naming unknown fields instead of skipping them.
    #[arg(long)]
    strict: bool,

    /// List every object.
    #[arg(long)]
    all: bool,

    /// Show the field values of each object.
    #[arg(long = "v", conflicts_with = "vv")]
    verbose: bool,

    /// Show each object as JSON.
    #[arg(long = "vv")]
    very_verbose: bool,

    /// Time zone for datetimes without an offset, e.g. UTC or +08:00.
    #[arg(long, value_parser = parse_timezone, allow_hyphen_values = true)]
    timezone: Option<FixedOffset>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let tz = match args.timezone {
        Some(tz) => tz,
        None => parse_timezone("UTC")?,
    };

    let db = load_path(&args.fixture, &tz)
        .with_context(|| format!("loading {}", args.fixture.display()))?;
    let queryset = db.all(&args.model)?;
    let model = queryset.model();

    let mut filter = QuerySetFilter::new(Resolver::new().strict(args.strict).timezone(tz));
    for clauses in args.filter {
        filter.add_filter(clauses);
    }
    for clauses in args.exclude {
        filter.add_exclude(clauses);
    }

    let objects = filter.apply(queryset, args.order_by.as_deref(), None)?;
    let total = objects.count();

    let limit = match (args.all, args.limit) {
        (true, _) => None,
        (false, Some(limit)) => Some(usize::try_from(limit)?),
        (false, None) => Some(DEFAULT_LIMIT),
    };
    debug!("{} objects matched, limit {:?}", total, limit);

    let objects = match limit {
        Some(limit) => objects.limit(limit),
        None => objects,
    };

    for row in objects.rows() {
        if args.verbose {
            println!("{}", to_dict(model, row));
        } else if args.very_verbose {
            println!("{}", serde_json::to_string(&to_json(model, row, &tz))?);
        } else {
            println!("{}", display(model, row));
        }
    }

    println!("---------------------");
    println!("Count: {}", total);

    if let Some(limit) = limit {
        if total > limit {
            println!(
                "\nNOTICE: Only first {} objects were listed. \n        Use --all to display all objects.",
                limit
            );
        }
    }

    Ok(())
}
