use tinyorm::construct::Model;
use tinyorm::database::Database;
use tinyorm::field::Field;
use tinyorm::settings::Settings;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> tinyorm::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::load()?;
    let db = Database::open(&settings)?;

    db.define(Model::new("Author").with_field("name", Field::string()))?;
    db.define(
        Model::new("Tag")
            .with_field("label", Field::string())
            .with_field("weight", Field::float().default(1.0)),
    )?;
    db.define(
        Model::new("Book")
            .with_field("title", Field::string())
            .with_field("pages", Field::int().blank())
            .with_field("meta", Field::json().blank())
            .with_field("author", Field::foreign_key("Author"))
            .with_field("tags", Field::many_to_many("Tag")),
    )?;
    print!("{}", db.registry.lock()?.describe());

    let mut author = db.create("Author")?;
    author.set("name", "Ursula K. Le Guin")?;
    let mut book = db.create("Book")?;
    book.set("title", "The Left Hand of Darkness")?;
    book.set("pages", 304)?;
    book.set("author", author)?;
    db.save(&mut book)?;

    let mut tag = db.create("Tag")?;
    tag.set("label", "science fiction")?;
    db.save(&mut tag)?;
    let mut link = db.create("BookTags")?;
    link.set("book", book.clone())?;
    link.set("tag", tag.clone())?;
    db.save(&mut link)?;

    let mut author = db
        .fetch_one(&mut book, "author")?
        .ok_or_else(|| tinyorm::OrmError::NotFound("author".to_string()))?;
    for written in db.fetch_many(&mut author, "books")? {
        info!(book = %written, "written by {}", author.get("name").map(ToString::to_string).unwrap_or_default());
    }
    for tagged in &db.fetch_related(&mut tag, "book")? {
        info!(book = %tagged, "tagged {}", tag.get("label").map(ToString::to_string).unwrap_or_default());
    }
    Ok(())
}
