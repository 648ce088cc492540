//! Shared fixtures for the decoder and router benchmarks.

#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    group: TestGroup,
    input: &'static str,
}

impl TestCase {
    pub const fn new(name: &'static str, group: TestGroup, input: &'static str) -> Self {
        Self { name, group, input }
    }

    pub const fn small(name: &'static str, input: &'static str) -> Self {
        Self::new(name, TestGroup::Small, input)
    }

    pub const fn large(name: &'static str, input: &'static str) -> Self {
        Self::new(name, TestGroup::Large, input)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> TestGroup {
        self.group
    }

    pub fn input(&self) -> &'static str {
        self.input
    }
}

#[derive(Clone, Copy, Debug)]
pub enum TestGroup {
    Small,
    Large,
}

pub const SMALL_REQUEST: &str = "GET /api/courses/42 HTTP/1.1\r\nHost: 127.0.0.1:3000\r\nAccept: */*\r\n\r\n";

pub const LARGE_REQUEST: &str = "GET /api/courses/42?sort=asc&page=3 HTTP/1.1\r\n\
Host: 127.0.0.1:3000\r\n\
User-Agent: Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36\r\n\
Accept: text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8\r\n\
Accept-Language: en-US,en;q=0.9,zh-CN;q=0.8\r\n\
Accept-Encoding: gzip, deflate, br, zstd\r\n\
Cache-Control: max-age=0\r\n\
Connection: keep-alive\r\n\
Cookie: session=6f1d2c9a8e7b4a3f; theme=dark; locale=en-US\r\n\
Referer: http://127.0.0.1:3000/api/courses\r\n\
Sec-Fetch-Dest: document\r\n\
Sec-Fetch-Mode: navigate\r\n\
Sec-Fetch-Site: same-origin\r\n\
Upgrade-Insecure-Requests: 1\r\n\r\n";

/// Route templates registered for the router benchmarks, in registration order.
pub const TEMPLATES: [&str; 8] = [
    "/",
    "/api/courses/:id?",
    "/api/courses/:id/lessons",
    "/api/courses/:id/lessons/:lesson",
    "/api/users",
    "/api/users/:user",
    "/api/users/:user/courses/:course?",
    "/static/:file",
];
