use anyhow::Context;
use ninegeek_api::{
    Comment, Error as ApiError, LoginRequest, LoginResponse, NewComment, NewThread, Thread,
    ThreadId,
};

#[derive(structopt::StructOpt)]
struct Opt {
    #[structopt(short, long, default_value = "http://localhost:8080")]
    host: String,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(structopt::StructOpt)]
enum Command {
    /// Check a username with the server
    Login { username: String },

    /// Start a new thread
    CreateThread {
        title: String,
        content: String,

        #[structopt(short, long, default_value = "")]
        author: String,
    },

    /// List all threads
    ListThreads,

    /// Show a thread along with its comments
    ShowThread { id: ThreadId },

    /// Comment on a thread
    Comment {
        thread: ThreadId,
        author: String,
        content: String,
    },

    /// List the comments of a thread
    ListComments { thread: ThreadId },
}

async fn parse_response<T>(resp: reqwest::Response) -> anyhow::Result<T>
where
    T: for<'de> serde::Deserialize<'de>,
{
    let status = resp.status();
    let body = resp.bytes().await.context("reading response body")?;
    if status.is_success() {
        return serde_json::from_slice(&body).context("parsing response body");
    }
    let err = ApiError::parse(&body)
        .with_context(|| format!("parsing error response with status {status}"))?;
    Err(err.into())
}

fn print_thread(t: &Thread) {
    let author = if t.author.is_empty() {
        "anonymous"
    } else {
        &t.author[..]
    };
    println!("#{} {} (by {author})", t.id, t.title);
    println!("    {}", t.content);
}

fn print_comment(c: &Comment) {
    println!("  [{}] {}: {}", c.id.0, c.author, c.content);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opt = <Opt as structopt::StructOpt>::from_args();

    let client = reqwest::Client::new();
    let host = opt.host.trim_end_matches('/');

    match opt.cmd {
        Command::Login { username } => {
            let resp: LoginResponse = parse_response(
                client
                    .post(format!("{host}/users/login"))
                    .json(&LoginRequest { username })
                    .send()
                    .await?,
            )
            .await?;
            println!("{}: {}", resp.message, resp.username);
        }
        Command::CreateThread {
            title,
            content,
            author,
        } => {
            let t: Thread = parse_response(
                client
                    .post(format!("{host}/threads"))
                    .json(&NewThread::new(title, content, author))
                    .send()
                    .await?,
            )
            .await?;
            print_thread(&t);
        }
        Command::ListThreads => {
            let threads: Vec<Thread> =
                parse_response(client.get(format!("{host}/threads")).send().await?).await?;
            for t in &threads {
                print_thread(t);
            }
        }
        Command::ShowThread { id } => {
            let t: Thread =
                parse_response(client.get(format!("{host}/threads/{id}")).send().await?)
                    .await?;
            print_thread(&t);
            for c in &t.comments {
                print_comment(c);
            }
        }
        Command::Comment {
            thread,
            author,
            content,
        } => {
            let c: Comment = parse_response(
                client
                    .post(format!("{host}/threads/{thread}/comments"))
                    .json(&NewComment::new(author, content))
                    .send()
                    .await?,
            )
            .await?;
            print_comment(&c);
        }
        Command::ListComments { thread } => {
            let comments: Vec<Comment> = parse_response(
                client
                    .get(format!("{host}/threads/{thread}/comments"))
                    .send()
                    .await?,
            )
            .await?;
            for c in &comments {
                print_comment(c);
            }
        }
    }

    Ok(())
}
