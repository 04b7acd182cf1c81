use bytes::Bytes;
use micro_sock::protocol::StreamEvent;

#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    group: TestGroup,
    file: TestFile,
}

impl TestCase {
    pub fn new(name: &'static str, group: TestGroup, file: TestFile) -> Self {
        Self { name, group, file }
    }

    pub fn small(name: &'static str, file: TestFile) -> Self {
        Self::new(name, TestGroup::Small, file)
    }

    pub fn normal(name: &'static str, file: TestFile) -> Self {
        Self::new(name, TestGroup::Normal, file)
    }

    pub fn large(name: &'static str, file: TestFile) -> Self {
        Self::new(name, TestGroup::Large, file)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> TestGroup {
        self.group
    }

    pub fn file(&self) -> &TestFile {
        &self.file
    }

    /// The file as a byte stream delivers it: reads of the group's size, then `Completed`.
    pub fn chunks(&self) -> Vec<StreamEvent<Bytes>> {
        let content = Bytes::from_static(self.file.content().as_bytes());
        let read_size = self.group.read_size();

        let mut events: Vec<_> = (0..content.len())
            .step_by(read_size)
            .map(|start| StreamEvent::Data(content.slice(start..content.len().min(start + read_size))))
            .collect();
        events.push(StreamEvent::Completed);
        events
    }
}

#[derive(Debug, Copy, Clone)]
pub struct TestFile {
    file_name: &'static str,
    content: &'static str,
}

impl TestFile {
    pub const fn new(file_name: &'static str, content: &'static str) -> Self {
        Self { file_name, content }
    }

    pub fn content(&self) -> &'static str {
        self.content
    }

    pub fn file_name(&self) -> &'static str {
        self.file_name
    }
}

/// Read size class of a benchmark.
#[derive(Clone, Copy, Debug)]
pub enum TestGroup {
    Small,
    Normal,
    Large,
}

impl TestGroup {
    pub fn read_size(self) -> usize {
        match self {
            TestGroup::Small => 64,
            TestGroup::Normal => 1024,
            TestGroup::Large => 16 * 1024,
        }
    }
}
