//! Shared helpers for the integration tests
#![allow(dead_code)]

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use tua::{Error, Evaluator, Parser, Scanner};

/// Output sink that keeps everything `print` wrote
#[derive(Clone, Default)]
pub struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl SharedBuf {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Scan, parse, and execute a program, capturing its output
pub fn try_run(source: &str) -> Result<(Evaluator, String), Error> {
    let mut scanner = Scanner::new(source);
    let tokens = scanner.scan_tokens()?;

    let mut parser = Parser::new(tokens);
    let program = parser.parse()?;

    let buffer = SharedBuf::default();
    let mut evaluator = Evaluator::with_output(Box::new(buffer.clone()));
    evaluator.execute(&program)?;

    Ok((evaluator, buffer.contents()))
}

/// Run a program that must succeed, returning its captured output
pub fn run_ok(source: &str) -> String {
    match try_run(source) {
        Ok((_, output)) => output,
        Err(err) => panic!("program failed: {}", err),
    }
}

/// Run a program that must succeed, returning the evaluator for inspection
pub fn run_for_state(source: &str) -> Evaluator {
    match try_run(source) {
        Ok((evaluator, _)) => evaluator,
        Err(err) => panic!("program failed: {}", err),
    }
}

/// Run a program that must fail, returning the error
pub fn run_err(source: &str) -> Error {
    match try_run(source) {
        Ok((_, output)) => panic!("program unexpectedly succeeded with output {:?}", output),
        Err(err) => err,
    }
}
