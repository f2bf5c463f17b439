use rand::Rng;

const NUM_AUTHORS: usize = 8;
const NUM_THREADS: usize = 50;
const NUM_COMMENTS: usize = 400;

const THREAD_TITLE_WORDS: usize = 6;
const THREAD_CONTENT_WORDS: usize = 60;
const COMMENT_WORDS: usize = 25;

fn gen_n_items(table: &str, columns: &str, n: usize, mut f: impl FnMut(usize) -> String) {
    println!("INSERT INTO {} ({}) VALUES", table, columns);
    for i in 0..n {
        if i != 0 {
            println!(",");
        }
        print!("    {}", f(i));
    }
    println!();
    println!("ON CONFLICT DO NOTHING;");
}

fn sql_str(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn main() {
    let mut rng = rand::thread_rng();

    let authors = (0..NUM_AUTHORS)
        .map(|_| lipsum::lipsum_words_with_rng(&mut rng, 1).to_lowercase())
        .collect::<Vec<_>>();

    // Generate threads, with an empty author every now and then as it is optional
    gen_n_items("threads", "id, title, content, author", NUM_THREADS, |i| {
        let author = match rng.gen_ratio(1, 5) {
            true => "",
            false => authors[rng.gen_range(0..authors.len())].as_str(),
        };
        format!(
            "({}, {}, {}, {})",
            i + 1,
            sql_str(&lipsum::lipsum_words_with_rng(&mut rng, THREAD_TITLE_WORDS)),
            sql_str(&lipsum::lipsum_words_with_rng(&mut rng, THREAD_CONTENT_WORDS)),
            sql_str(author),
        )
    });

    // Generate comments
    gen_n_items(
        "comments",
        "id, thread_id, content, author",
        NUM_COMMENTS,
        |i| {
            format!(
                "({}, {}, {}, {})",
                i + 1,
                rng.gen_range(1..=NUM_THREADS),
                sql_str(&lipsum::lipsum_words_with_rng(&mut rng, COMMENT_WORDS)),
                sql_str(&authors[rng.gen_range(0..authors.len())]),
            )
        },
    );

    // Move the sequences past the explicitly inserted ids
    println!("SELECT setval('threads_id_seq', (SELECT MAX(id) FROM threads));");
    println!("SELECT setval('comments_id_seq', (SELECT MAX(id) FROM comments));");
}
