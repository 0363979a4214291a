use sqlx::SqlitePool;
use tracing::info;

use crate::{
    course::{
        NewCourse, create_course,
        lesson::{NewLesson, create_lesson},
    },
    quiz::{NewQuiz, Question, add_quiz},
    user::{NewUser, Role, create_user},
};

struct SampleCourse {
    title: &'static str,
    description: &'static str,
    difficulty: &'static str,
    hours: i64,
    price: &'static str,
    lessons: [(&'static str, [&'static str; 3]); 4],
    quiz: &'static [(&'static str, [&'static str; 4], usize)],
}

const SAMPLE_COURSES: [SampleCourse; 2] = [
    SampleCourse {
        title: "Java Programming Masterclass",
        description: "Learn Java from the ground up, from syntax to Spring Boot applications.",
        difficulty: "Beginner",
        hours: 40,
        price: "49.99",
        lessons: [
            (
                "Introduction to Java",
                ["Introduction to Java", "Basic concepts", "Coding examples"],
            ),
            (
                "Intermediate Java",
                [
                    "Intermediate Java",
                    "Common patterns",
                    "Problem solving approaches",
                ],
            ),
            (
                "Advanced Java with Spring Boot",
                ["MVC Architecture", "Spring Boot", "Real-world applications"],
            ),
            (
                "Final Project",
                [
                    "Final project overview",
                    "Implementation steps",
                    "Testing and deployment",
                ],
            ),
        ],
        quiz: &[
            (
                "Which keyword creates a new object in Java?",
                ["new", "create", "make", "alloc"],
                0,
            ),
            (
                "Which method is the entry point of a Java program?",
                ["start", "run", "main", "init"],
                2,
            ),
            (
                "What does MVC stand for?",
                [
                    "Model View Controller",
                    "Main Virtual Class",
                    "Method Value Call",
                    "Module View Component",
                ],
                0,
            ),
            (
                "Which annotation marks a Spring Boot application class?",
                [
                    "@Application",
                    "@SpringBootApplication",
                    "@Boot",
                    "@EnableSpring",
                ],
                1,
            ),
        ],
    },
    SampleCourse {
        title: "Next.js for Modern Web Apps",
        description: "Build fast, production ready React applications with Next.js.",
        difficulty: "Intermediate",
        hours: 25,
        price: "59.99",
        lessons: [
            (
                "Introduction to Next.js",
                [
                    "Next.js Fundamentals",
                    "Pages and Routing",
                    "Server-Side Rendering vs. Static Generation",
                ],
            ),
            (
                "Data Fetching and State Management",
                [
                    "API Routes",
                    "SWR and React Query",
                    "Working with External APIs",
                ],
            ),
            (
                "Advanced Next.js Features",
                [
                    "Middleware and Authentication",
                    "Image Optimization",
                    "Internationalization and Deployment",
                ],
            ),
            (
                "Next.js Project",
                [
                    "Project Planning and Architecture",
                    "Implementation with Next.js",
                    "Testing and Performance Optimization",
                ],
            ),
        ],
        quiz: &[
            (
                "Which folder defines routes in the App Router?",
                ["pages", "app", "routes", "src/routes"],
                1,
            ),
            (
                "Which function renders a page at build time?",
                [
                    "getServerSideProps",
                    "getInitialProps",
                    "getStaticProps",
                    "useEffect",
                ],
                2,
            ),
            (
                "Which component optimizes images in Next.js?",
                ["img", "Picture", "next/image", "ImageLoader"],
                2,
            ),
            (
                "Where does Next.js middleware run?",
                [
                    "Before a request is completed",
                    "Only in the browser",
                    "After rendering",
                    "At build time only",
                ],
                0,
            ),
        ],
    },
];

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub instructor_id: i64,
    pub created_courses: Vec<i64>,
    pub skipped_courses: Vec<String>,
}

/// Insert the sample instructor and courses. Existing rows (matched by
/// username and course title) are left alone, so running twice is harmless.
pub async fn seed(database: &SqlitePool, instructor_password: &str) -> anyhow::Result<SeedReport> {
    let instructor_id = match sqlx::query_scalar::<_, i64>("SELECT id FROM user WHERE username = ?")
        .bind("instructor")
        .fetch_optional(database)
        .await?
    {
        Some(id) => id,
        None => {
            let user = NewUser {
                username: "instructor".to_string(),
                email: "instructor@example.com".to_string(),
                password: instructor_password.to_string(),
                first_name: "Sample".to_string(),
                last_name: "Instructor".to_string(),
                role: Role::Instructor,
            };
            create_user(database, user).await?.id
        }
    };
    let mut report = SeedReport {
        instructor_id,
        ..Default::default()
    };
    for sample in &SAMPLE_COURSES {
        let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM course WHERE title = ?")
            .bind(sample.title)
            .fetch_optional(database)
            .await?
            .is_some();
        if exists {
            info!("course {} already exists, skipped", sample.title);
            report.skipped_courses.push(sample.title.to_string());
            continue;
        }
        let course = create_course(
            database,
            instructor_id,
            NewCourse {
                title: sample.title.to_string(),
                description: sample.description.to_string(),
                difficulty: sample.difficulty.to_string(),
                hours: sample.hours,
                price: sample.price.to_string(),
                rating: None,
            },
        )
        .await?;
        for (order, (title, chapters)) in sample.lessons.iter().enumerate() {
            create_lesson(
                database,
                NewLesson {
                    course_id: course.id,
                    title: title.to_string(),
                    chapters: chapters.iter().map(|ch| ch.to_string()).collect(),
                    order: order as i64 + 1,
                },
            )
            .await?;
        }
        let questions = sample
            .quiz
            .iter()
            .map(|(question, options, answer)| Question {
                question: question.to_string(),
                options: options.iter().map(|o| o.to_string()).collect(),
                answer: options[*answer].to_string(),
            })
            .collect();
        add_quiz(
            database,
            NewQuiz {
                course_id: course.id,
                questions,
            },
        )
        .await?;
        info!("seeded course {}-{}", course.id, course.title);
        report.created_courses.push(course.id);
    }
    Ok(report)
}
