use std::time::Duration;

use reqwest::blocking::Client;
use structopt::StructOpt;

mod operations;

/// Submit weather jobs and follow their progress
#[derive(StructOpt, Debug)]
#[structopt(name = "wjob-client")]
struct Opt {
    /// server base url
    #[structopt(long, default_value = "http://127.0.0.1:8000")]
    url: String,

    #[structopt(subcommand)]
    operation: Operation,
}

#[derive(Debug, StructOpt)]
enum Operation {
    /// start a weather job for a user id
    Submit(UserOperation),
    /// show status and progress of a job
    Status(UserOperation),
    /// poll a job until it is completed or failed
    Watch(WatchOperation),
    /// list every stored weather record
    Records,
}

#[derive(Debug, StructOpt)]
struct UserOperation {
    #[structopt(name = "USER_ID", allow_hyphen_values = true)]
    user_id: i64,
}

#[derive(Debug, StructOpt)]
struct WatchOperation {
    #[structopt(name = "USER_ID", allow_hyphen_values = true)]
    user_id: i64,
    /// seconds between polls
    #[structopt(long, default_value = "2")]
    interval: u64,
}

fn main() {
    let opt = Opt::from_args();
    let url = opt.url.trim_end_matches('/');
    let client = Client::new();
    let result = match opt.operation {
        Operation::Submit(op) => operations::submit(&client, url, op.user_id),
        Operation::Status(op) => operations::status(&client, url, op.user_id),
        Operation::Watch(op) => operations::watch(
            &client,
            url,
            op.user_id,
            Duration::from_secs(op.interval),
        ),
        Operation::Records => operations::records(&client, url),
    };
    match result {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("error executing request: {}", e);
            std::process::exit(1);
        }
    }
}
