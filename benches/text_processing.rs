use criterion::{black_box, criterion_group, criterion_main, Criterion};

use companion_chat::corpus::{build_history_document, Document};
use companion_chat::rag::Chunker;
use companion_chat::{Message, Role};

fn chunker_benchmark(c: &mut Criterion) {
    let chunker = Chunker::new(200, 20);
    let document = Document::new(
        "每天清晨我们会给老人发一句问候，陪他们聊聊家常，听他们讲过去的故事。".repeat(64),
        "bench",
    );

    c.bench_function("chunker_split_long_document", |b| {
        b.iter(|| {
            let chunks = chunker.chunk(black_box(&document));
            black_box(chunks.len());
        });
    });
}

fn history_rendering_benchmark(c: &mut Criterion) {
    let messages: Vec<Message> = (0..256)
        .map(|i| {
            let role = if i % 2 == 0 { Role::User } else { Role::Agent };
            Message::new(role, format!("第{}句聊天内容，说说今天的天气和饭菜。", i))
        })
        .collect();

    c.bench_function("history_document_render", |b| {
        b.iter(|| {
            let doc = build_history_document(black_box(&messages));
            black_box(doc.content.len());
        });
    });
}

criterion_group!(text_processing, chunker_benchmark, history_rendering_benchmark);
criterion_main!(text_processing);
