use std::path::PathBuf;

use clap::Parser;
use course_server::{db, seed::seed, utils::init_log};
use tracing::info;

#[derive(Debug, Parser)]
#[command(author, version, about = "Insert the sample instructor, courses and quizzes")]
struct Args {
    #[arg(short, long, default_value = "database/course.db")]
    database: PathBuf,
    /// Password of the sample instructor account when it is created
    #[arg(short, long, env = "SEED_INSTRUCTOR_PASSWORD", default_value = "instructor")]
    password: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _guard = init_log(None, "info")?;
    let args = Args::parse();
    let database = db::connect(&args.database).await?;
    let report = seed(&database, &args.password).await?;
    info!(
        "instructor {}: created courses {:?}, skipped {:?}",
        report.instructor_id, report.created_courses, report.skipped_courses
    );
    Ok(())
}
