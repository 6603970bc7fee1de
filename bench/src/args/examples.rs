const EXAMPLES: &str = r#"EXAMPLES:

1) Count-bounded benchmark over a unix socket pair:

    Send 1000 buffers of 1 KiB through one flow and report how long it took:

    $ cargo r --bin pipebench -r

    Send 100000 buffers of 64 KiB through each of 4 concurrent flows:

    $ cargo r --bin pipebench -r -- -s 64k -n 100000 --flows 4

2) Time-bounded benchmark:

    Run 8 concurrent flows over TCP loopback for 10 seconds with 1 MiB buffers:

    $ cargo r --bin pipebench -r -- --transport tcp -s 1m -n 8 -t 10s

    In time-bounded mode `-n` is the number of flows, `-t` accepts plain
    seconds (1.5), an s or m suffix (10s, 2m) or any humantime duration.

3) Consumers in separate processes:

    Every consumer runs in a child process of the benchmark:

    $ cargo r --bin pipebench -r -- --isolation process -s 16k -n 50000 --flows 2

4) Reclaiming received buffers:

    The consumer receives into a fresh buffer per read and hands it to a
    background thread that frees it:

    $ cargo r --bin pipebench -r -- --reclaim -s 4k -t 5

5) Buffer size sweep:

    Measure 16 KiB, 32 KiB and so on up to 32 MiB buffers, each until its
    samples settle, and print the best average and the highest sample:

    $ cargo r --bin pipebench -r -- --sweep 16k..32m

    Two flows over TCP loopback, accepting 5% deviation:

    $ cargo r --bin pipebench -r -- --transport tcp --sweep 4k..1m -n 2 --tolerance 0.05

6) Saving results:

    Write report.json, samples.csv and a trace level log file to a directory:

    $ cargo r --bin pipebench -r -- -t 10 -n 2 --sampling-time 50ms -o results --remark baseline

    If more options are needed, please refer to the help menu:

    $ cargo r --bin pipebench -r -- --help

"#;

pub fn print_examples() {
    print!("{}", EXAMPLES)
}
