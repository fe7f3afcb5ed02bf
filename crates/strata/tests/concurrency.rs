use std::sync::mpsc;
use std::thread;

use anyhow::Result;
use rand::{rngs::StdRng, Rng, SeedableRng};
use strata::{Buffer, ElementType};

#[test]
fn handles_migrate_between_threads() -> Result<()> {
    let original = Buffer::new(ElementType::int(32), &[32, 32], "migrating")?;
    let host = original.host_ptr() as usize;
    let (tx, rx) = mpsc::channel::<Buffer>();

    let consumer = thread::spawn(move || {
        let mut seen = 0usize;
        for handle in rx {
            assert_eq!(handle.name(), "migrating");
            assert_eq!(handle.host_ptr() as usize, host);
            assert_eq!(handle.extent(1).ok(), Some(32));
            seen += 1;
        }
        seen
    });

    let producers: Vec<_> = (0..4u64)
        .map(|seed| {
            let handle = original.clone();
            let tx = tx.clone();
            thread::spawn(move || {
                let mut rng = StdRng::seed_from_u64(seed);
                for _ in 0..100 {
                    let copy = handle.clone();
                    if rng.gen_bool(0.5) {
                        tx.send(copy).expect("consumer alive");
                    }
                }
            })
        })
        .collect();
    drop(tx);
    drop(original);

    for producer in producers {
        producer.join().expect("producer panicked");
    }
    let seen = consumer.join().expect("consumer panicked");
    assert!(seen > 0);
    Ok(())
}

#[test]
fn last_release_on_any_thread_frees_contents() -> Result<()> {
    for round in 0..16 {
        let buffer = Buffer::new(ElementType::float(32), &[128], format!("round{round}"))?;
        let handles: Vec<Buffer> = (0..8).map(|_| buffer.clone()).collect();
        assert_eq!(buffer.ref_count(), 9);
        drop(buffer);

        let survivor = handles[0].clone();
        let workers: Vec<_> = handles
            .into_iter()
            .map(|handle| thread::spawn(move || drop(handle)))
            .collect();
        for worker in workers {
            worker.join().expect("worker panicked");
        }
        assert_eq!(survivor.ref_count(), 1);
        assert!(survivor.defined());
    }
    Ok(())
}
