//! Out-of-order producer calls fail fast instead of touching shared memory.

mod common;

use common::enabled_channel;

#[test]
#[should_panic(expected = "already open")]
fn begin_while_a_record_is_open() {
    let (mut channel, mut host) = enabled_channel(256, 16);
    assert!(channel.begin_update(&mut host));
    channel.begin_update(&mut host);
}

#[test]
#[should_panic(expected = "without an open record")]
fn write_without_begin() {
    let (mut channel, mut host) = enabled_channel(256, 16);
    channel.write(&mut host, b"orphan");
}

#[test]
#[should_panic(expected = "without an open record")]
fn end_without_begin() {
    let (mut channel, _host) = enabled_channel(256, 16);
    channel.end_update();
}

#[test]
#[should_panic(expected = "without an open record")]
fn end_twice() {
    let (mut channel, mut host) = enabled_channel(256, 16);
    assert!(channel.begin_update(&mut host));
    channel.end_update();
    channel.end_update();
}

#[test]
#[should_panic(expected = "without an open record")]
fn write_after_disable_dropped_the_record() {
    let (mut channel, mut host) = enabled_channel(256, 16);
    assert!(channel.begin_update(&mut host));
    channel.disable(&mut host, Some(0));
    channel.write(&mut host, b"late");
}
