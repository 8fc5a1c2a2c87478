//! Basic example demonstrating record macros, named parameters and the
//! materialization strategies
//!
//! Run with: cargo run --example basic
//!
//! Uses an in-memory database unless DATABASE_URL is set:
//! export DATABASE_URL="sqlite://demo.db?mode=rwc"

use sqlx::{Connection, SqliteConnection};
use sqlx_record_bind::{args, record, Arg, Destination, Querier, ValueMap};

record! {
    #[derive(Debug, Default)]
    struct User {
        #[db = "id"]
        id: i64,
        #[db = "name"]
        name: String,
        #[db = "email"]
        email: String,
    }
}

record! {
    #[derive(Debug, Default)]
    struct Post {
        #[db = "id"]
        id: i64,
        #[db = "author"]
        author: i64,
        #[db = "title"]
        title: String,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Load .env file if present
    dotenvy::dotenv().ok();

    // Get database URL from environment
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite::memory:".to_string());

    println!("Connecting to database...");
    let mut conn = SqliteConnection::connect(&database_url).await?;
    let querier = Querier::new().with_hook(|stmt| println!("  > {stmt}"));

    // Create tables if they don't exist
    println!("\nCreating tables...");
    querier
        .exec(
            &mut conn,
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE
            )",
            Vec::new(),
        )
        .await?;
    querier
        .exec(
            &mut conn,
            "CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                author INTEGER NOT NULL REFERENCES users(id),
                title TEXT NOT NULL
            )",
            Vec::new(),
        )
        .await?;

    // Example 1: Insert from records
    println!("\n--- Example 1: Inserting users ---");
    let users_to_insert = vec![
        ("Alice", "alice@example.com"),
        ("Bob", "bob@example.com"),
        ("Charlie", "charlie@example.com"),
    ];

    for (name, email) in users_to_insert {
        let user = User {
            id: 0,
            name: name.into(),
            email: email.into(),
        };
        let result = querier
            .exec(
                &mut conn,
                "INSERT OR IGNORE INTO users (name, email) VALUES (:name, :email)",
                vec![Arg::record(&user)],
            )
            .await?;
        println!(
            "Inserted user '{}': last_insert_rowid={}",
            name,
            result.last_insert_rowid()
        );
    }

    // Example 2: Fetch all users into a collection
    println!("\n--- Example 2: Fetching all users ---");
    let mut users: Vec<User> = Vec::new();
    querier
        .for_many(&mut users)?
        .query(&mut conn, "SELECT {User} FROM users ORDER BY id", Vec::new())
        .await?;
    println!("Found {} users:", users.len());
    for user in &users {
        println!("  - {} (id={}, email={})", user.name, user.id, user.email);
    }

    // Example 3: Single user by email, named parameter from a map
    println!("\n--- Example 3: Finding user by email ---");
    let mut filter = ValueMap::new();
    filter.insert("email".into(), "alice@example.com".into());

    let mut alice = User::default();
    querier
        .for_one([Destination::record(&mut alice)])?
        .query(
            &mut conn,
            "SELECT {u INTO User} FROM users AS u WHERE u.email = :email",
            args![&filter],
        )
        .await?;
    println!("Found user: {} ({})", alice.name, alice.email);

    // Example 4: Join two records sharing the `id` column
    println!("\n--- Example 4: Joining users and posts ---");
    querier
        .exec(
            &mut conn,
            "INSERT INTO posts (author, title) VALUES (?, ?)",
            args![alice.id, "Hello from Alice"],
        )
        .await?;

    let (mut author, mut post) = (User::default(), Post::default());
    querier
        .for_one([Destination::record(&mut author), Destination::record(&mut post)])?
        .query(
            &mut conn,
            "SELECT {u INTO User}, {p INTO Post}
             FROM users AS u JOIN posts AS p ON p.author = u.id
             WHERE u.id = ?",
            args![alice.id],
        )
        .await?;
    println!(
        "Post #{} '{}' by {} (user id={})",
        post.id, post.title, author.name, author.id
    );

    // Example 5: Map and scalar destinations
    println!("\n--- Example 5: Maps and scalars ---");
    let mut row = ValueMap::new();
    querier
        .for_one([Destination::map(&mut row)])?
        .query(
            &mut conn,
            "SELECT name, email FROM users WHERE id = ?",
            args![alice.id],
        )
        .await?;
    println!("Row as map: {row:?}");

    let mut count = 0i64;
    querier
        .for_one([Destination::scalar(&mut count)])?
        .query(&mut conn, "SELECT count(*) FROM users", Vec::new())
        .await?;
    println!("{count} users in total");

    // Cleanup
    println!("\nCleaning up...");
    querier
        .exec(&mut conn, "DROP TABLE IF EXISTS posts", Vec::new())
        .await?;
    querier
        .exec(&mut conn, "DROP TABLE IF EXISTS users", Vec::new())
        .await?;

    println!(
        "\n{} statements cached, {} record types reflected",
        querier.statement_cache().len(),
        querier.reflect_cache().len()
    );
    println!("\nExample completed successfully!");
    Ok(())
}
